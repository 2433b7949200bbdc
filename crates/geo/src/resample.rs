//! Nearest neighbour alignment of a raster onto the pixel lattice of another grid.
//!
//! Every target pixel whose center lies inside the overlap of both grids receives the value of the source pixel containing that center.
//! Integer upsampling results in pixel replication, integer downsampling in decimation, other ratios resolve deterministically in the same way.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{Error, GeoGrid, PixelWindow, RasterGrid, Result, rect::WorldRect};

/// Band values aligned on the lattice of a target grid, covering `window` of that grid
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedBand {
    pub window: PixelWindow,
    pub data: Vec<f64>,
}

fn check_supported(grid: &GeoGrid) -> Result<()> {
    grid.transform().invert()?;
    if !grid.is_axis_aligned() {
        return Err(Error::UnsupportedTransform(format!(
            "Resampling rotated grids is not supported ({:?})",
            grid.transform()
        )));
    }

    Ok(())
}

/// Range of pixel indexes along one axis with a center inside [`lower`, `upper`)
fn center_index_range(lower: f64, upper: f64, origin: f64, pixel_size: f64, pixel_count: usize) -> std::ops::Range<usize> {
    let p1 = (lower - origin) / pixel_size;
    let p2 = (upper - origin) / pixel_size;
    let (lo, hi) = (p1.min(p2), p1.max(p2));

    let clamp = |v: f64| v.clamp(0.0, pixel_count as f64) as usize;
    clamp((lo - 0.5).ceil())..clamp((hi - 0.5).ceil())
}

/// The block of target pixels with a center inside the overlap
fn target_window(target: &GeoGrid, overlap: &WorldRect) -> PixelWindow {
    let coefficients = target.transform().coefficients();
    let cols = center_index_range(overlap.min_x(), overlap.max_x(), coefficients[0], coefficients[1], target.cols());
    let rows = center_index_range(overlap.min_y(), overlap.max_y(), coefficients[3], coefficients[5], target.rows());

    PixelWindow::new(rows.start, cols.start, rows.len(), cols.len())
}

/// Maps every target pixel index along one axis to the source pixel containing its center
fn index_mapping(window_range: std::ops::Range<usize>, source_count: usize, to_source: impl Fn(f64) -> Result<f64>) -> Result<Vec<Option<usize>>> {
    window_range
        .map(|index| {
            let source_pos = to_source(index as f64 + 0.5)?.floor();
            if source_pos >= 0.0 && source_pos < source_count as f64 {
                Ok(Some(source_pos as usize))
            } else {
                Ok(None)
            }
        })
        .collect()
}

struct Alignment {
    window: PixelWindow,
    source_rows: Vec<Option<usize>>,
    source_cols: Vec<Option<usize>>,
}

fn alignment(source: &GeoGrid, target: &GeoGrid) -> Result<Alignment> {
    check_supported(source)?;
    check_supported(target)?;

    let overlap = source.overlap(target).ok_or(Error::DisjointRasters)?;
    let window = target_window(target, &overlap);
    if window.is_empty() {
        log::debug!("Overlap {overlap:?} does not contain any target pixel centers");
        return Err(Error::DisjointRasters);
    }

    // Both grids are axis aligned: the source column only depends on x, the source row only on y
    let reference = target.cell_center(crate::Cell::from_row_col(window.row_offset, window.col_offset));
    let source_cols = index_mapping(window.col_offset..window.col_offset + window.cols, source.cols(), |col| {
        let x = target.pixel_to_world(0.0, col).x();
        Ok(source.world_to_pixel(x, reference.y())?.1)
    })?;
    let source_rows = index_mapping(window.row_offset..window.row_offset + window.rows, source.rows(), |row| {
        let y = target.pixel_to_world(row, 0.0).y();
        Ok(source.world_to_pixel(reference.x(), y)?.0)
    })?;

    Ok(Alignment {
        window,
        source_rows,
        source_cols,
    })
}

fn apply_alignment(alignment: &Alignment, source_cols: usize, band: &[f64]) -> Vec<f64> {
    let mut data = vec![f64::NAN; alignment.window.size().cell_count()];
    let fill_row = |(row, output): (usize, &mut [f64])| {
        if let Some(source_row) = alignment.source_rows[row] {
            let source_line = &band[source_row * source_cols..(source_row + 1) * source_cols];
            for (out, source_col) in output.iter_mut().zip(&alignment.source_cols) {
                if let Some(source_col) = source_col {
                    *out = source_line[*source_col];
                }
            }
        }
    };

    if alignment.window.cols == 0 {
        return data;
    }

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            data.par_chunks_mut(alignment.window.cols).enumerate().for_each(fill_row);
        } else {
            data.chunks_mut(alignment.window.cols).enumerate().for_each(fill_row);
        }
    }

    data
}

/// Aligns a single band of the `source` grid onto the lattice of the `target` grid, restricted to the overlap
pub fn resample(source: &GeoGrid, source_band: &[f64], target: &GeoGrid) -> Result<AlignedBand> {
    if source_band.len() != source.size().cell_count() {
        return Err(Error::InvalidArgument(format!(
            "Band contains {} values, expected {} for raster size {}",
            source_band.len(),
            source.size().cell_count(),
            source.size()
        )));
    }

    let alignment = alignment(source, target)?;
    Ok(AlignedBand {
        window: alignment.window,
        data: apply_alignment(&alignment, source.cols(), source_band),
    })
}

/// Aligns all bands of the raster onto the lattice of the `target` grid.
/// The result is located on the window of the target grid that overlaps with the source.
pub fn resample_raster(source: &RasterGrid, target: &GeoGrid) -> Result<(PixelWindow, RasterGrid)> {
    let alignment = alignment(source.grid(), target)?;
    let bands = source
        .bands()
        .iter()
        .map(|band| apply_alignment(&alignment, source.cols(), band))
        .collect();

    let grid = target.window(&alignment.window)?;
    Ok((alignment.window, RasterGrid::new(grid, bands)?.with_nodata(source.nodata())))
}
