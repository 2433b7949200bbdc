//! Geospatial raster processing toolkit: tile pyramids with a statistics index,
//! cross-resolution raster differences, per-band statistics and validity masks.

#[doc(inline)]
pub use geo;
#[doc(inline)]
pub use inf;
#[cfg(feature = "tiler")]
#[doc(inline)]
pub use tiler;
