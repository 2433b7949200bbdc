use crate::{CellIterator, RasterGrid, Result};

/// Presence mask of the raster: 1 where any band holds a non-zero value, 0 elsewhere.
/// NaN values count as empty.
pub fn mask(raster: &RasterGrid) -> Result<RasterGrid> {
    mask_with_value(raster, 0.0)
}

/// Presence mask of the raster: 1 where any band holds a value different from `empty_value`, 0 elsewhere.
/// NaN values count as empty.
pub fn mask_with_value(raster: &RasterGrid, empty_value: f64) -> Result<RasterGrid> {
    let is_present = |v: f64| !v.is_nan() && v != empty_value;

    let data: Vec<f64> = CellIterator::for_raster_with_size(raster.size())
        .map(|cell| {
            if raster.pixel(cell).any(is_present) {
                1.0
            } else {
                0.0
            }
        })
        .collect();

    log::debug!(
        "Mask contains {} present pixels out of {}",
        data.iter().filter(|&&v| v == 1.0).count(),
        data.len()
    );

    RasterGrid::single_band(raster.grid().clone(), data)
}
