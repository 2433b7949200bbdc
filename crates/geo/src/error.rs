use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Geo transform is not invertible")]
    SingularTransform,
    #[error("Unsupported geo transform: {0}")]
    UnsupportedTransform(String),
    #[error("Rasters do not overlap")]
    DisjointRasters,
    #[error("Band count mismatch ({first} <-> {second})")]
    BandMismatch { first: usize, second: usize },
    #[error("Raster does not contain any valid pixels")]
    EmptyRaster,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    InfError(#[from] inf::Error),
    #[cfg(feature = "raster-io-geotiff")]
    #[error("TIFF error: {0}")]
    TiffError(#[from] tiff::TiffError),
}
