#![warn(clippy::unwrap_used)]

mod error;
pub mod pyramid;
mod tiledata;
mod tileindex;
mod tilekey;
mod tilestore;

#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use pyramid::{PyramidOptions, TilePyramid, TilePyramidBuilder};
#[doc(inline)]
pub use tiledata::{EncodedTile, NODATA_CODE, QUANTIZATION_BINS, TileData};
#[doc(inline)]
pub use tileindex::{TileEntry, TileIndex, TileRow};
#[doc(inline)]
pub use tilekey::TileKey;
#[doc(inline)]
pub use tilestore::{DirectoryTileStore, INDEX_FILE_NAME};

pub type Result<T = ()> = std::result::Result<T, Error>;
