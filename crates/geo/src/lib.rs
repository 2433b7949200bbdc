#![warn(clippy::unwrap_used)]

pub type Result<T = ()> = std::result::Result<T, Error>;
pub mod algo;
mod arraydatatype;
mod cell;
mod error;
mod geogrid;
#[cfg(feature = "raster-io-geotiff")]
pub mod geotiff;
mod geotransform;
mod histogram;
mod nodata;
mod rastergrid;
mod rastersize;
pub mod rect;
pub mod resample;
mod statistics;

#[cfg(test)]
mod testutils;

#[doc(inline)]
pub use arraydatatype::ArrayDataType;
#[doc(inline)]
pub use cell::Cell;
#[doc(inline)]
pub use cell::CellIterator;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use geogrid::GeoGrid;
#[doc(inline)]
pub use geogrid::PixelWindow;
#[doc(inline)]
pub use geotransform::GeoTransform;
#[doc(inline)]
pub use histogram::{HistBin, Histogram, HistogramConfig};
#[doc(inline)]
pub use nodata::NodataPolicy;
#[doc(inline)]
pub use rastergrid::RasterGrid;
#[doc(inline)]
pub use rastersize::RasterSize;
#[doc(inline)]
pub use rect::WorldRect;
#[doc(inline)]
pub use statistics::StatAccumulator;

pub type Point<T = f64> = geo_types::Point<T>;
