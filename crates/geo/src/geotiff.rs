//! GeoTIFF reading and writing using the pure Rust tiff crate.

mod decoder;
mod projectioninfo;
mod writer;

pub use decoder::{read_raster, read_raster_from};
pub use projectioninfo::{ModelType, ProjectionInfo};
pub use writer::write_raster;
