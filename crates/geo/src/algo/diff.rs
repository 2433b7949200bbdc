use crate::{Error, Histogram, HistogramConfig, RasterGrid, Result, StatAccumulator, resample::resample_raster};

use super::ordered_map;

#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiffOptions {
    /// Report `first - second` instead of `second - first`
    pub negate: bool,
    /// Bin the differences, also enables the discretized output raster
    pub histogram: Option<HistogramConfig>,
}

/// Nodata value of the discretized difference raster
pub const DISCRETIZED_NODATA: f64 = -128.0;

/// Statistics of a raster difference, `diff` and `abs_diff` combine all bands
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiffStats {
    pub diff: StatAccumulator,
    pub first: StatAccumulator,
    pub second: StatAccumulator,
    pub abs_diff: StatAccumulator,
    pub bands: Vec<StatAccumulator>,
}

impl DiffStats {
    fn with_band_count(band_count: usize) -> Self {
        DiffStats {
            bands: vec![StatAccumulator::new(); band_count],
            ..Default::default()
        }
    }

    fn merge_band(&mut self, band: usize, other: &DiffStats) {
        self.diff += &other.diff;
        self.first += &other.first;
        self.second += &other.second;
        self.abs_diff += &other.abs_diff;
        self.bands[band] += &other.diff;
    }
}

/// The serializable report of a diff run
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiffSummary {
    pub pix_area_1: f64,
    pub pix_area_2: f64,
    pub stats: DiffStats,
}

#[derive(Debug, Clone)]
pub struct DiffResult {
    /// Per pixel differences on the lattice of the finer raster, restricted to the overlap. NaN marks nodata.
    pub raster: RasterGrid,
    pub summary: DiffSummary,
    /// Histogram of the differences of all bands, present when binning was requested
    pub histogram: Option<Histogram>,
    /// Histogram class of every difference pixel (see [`HistogramConfig::class_for`]), nodata is [`DISCRETIZED_NODATA`]
    pub discretized: Option<RasterGrid>,
}

impl DiffResult {
    pub fn stats(&self) -> &DiffStats {
        &self.summary.stats
    }
}

/// Computes the pixel wise difference `second - first` over the overlap of both rasters.
///
/// The coarser raster (largest pixel area) is resampled with nearest neighbour onto the lattice of the finer one,
/// when both have the same pixel area the first raster provides the lattice.
/// Pixels that are nodata in either raster are excluded from the statistics.
pub fn diff(first: &RasterGrid, second: &RasterGrid, options: &DiffOptions) -> Result<DiffResult> {
    if first.grid().overlap(second.grid()).is_none() {
        return Err(Error::DisjointRasters);
    }

    if first.band_count() != second.band_count() {
        return Err(Error::BandMismatch {
            first: first.band_count(),
            second: second.band_count(),
        });
    }

    let pix_area_1 = first.grid().pixel_area();
    let pix_area_2 = second.grid().pixel_area();
    let first_is_finer = pix_area_1 <= pix_area_2;
    let (fine, coarse) = if first_is_finer { (first, second) } else { (second, first) };

    log::debug!(
        "Diff pixel areas {pix_area_1} <-> {pix_area_2}, resampling the {} raster",
        if first_is_finer { "second" } else { "first" }
    );

    let (window, aligned) = resample_raster(coarse, fine.grid())?;
    let fine_policy = fine.nodata_policy();
    let coarse_policy = coarse.nodata_policy();
    let sign = if options.negate { -1.0 } else { 1.0 };

    let mut stats = DiffStats::with_band_count(first.band_count());
    let mut histogram = options.histogram.map(Histogram::new);
    let mut output_bands = Vec::with_capacity(first.band_count());
    let mut discretized_bands = Vec::with_capacity(first.band_count());

    for (band_index, (fine_band, aligned_band)) in fine.bands().iter().zip(aligned.bands()).enumerate() {
        let rows = ordered_map(0..window.rows, |row| {
            let fine_start = (window.row_offset + row) * fine.cols() + window.col_offset;
            let fine_line = &fine_band[fine_start..fine_start + window.cols];
            let aligned_line = &aligned_band[row * window.cols..(row + 1) * window.cols];

            let mut row_stats = DiffStats::default();
            let output: Vec<f64> = fine_line
                .iter()
                .zip(aligned_line)
                .map(|(&fine_value, &coarse_value)| {
                    if fine_policy.is_nodata(fine_value) || coarse_policy.is_nodata(coarse_value) {
                        return f64::NAN;
                    }

                    let (v1, v2) = if first_is_finer {
                        (fine_value, coarse_value)
                    } else {
                        (coarse_value, fine_value)
                    };

                    let delta = sign * (v2 - v1);
                    row_stats.first.add(v1);
                    row_stats.second.add(v2);
                    row_stats.diff.add(delta);
                    row_stats.abs_diff.add(delta.abs());
                    delta
                })
                .collect();

            let binned = options.histogram.map(|config| {
                let mut row_hist = Histogram::new(config);
                let classes: Vec<f64> = output
                    .iter()
                    .map(|&delta| {
                        if delta.is_nan() {
                            DISCRETIZED_NODATA
                        } else {
                            row_hist.add(delta);
                            config.class_for(delta) as f64
                        }
                    })
                    .collect();
                (classes, row_hist)
            });

            (output, row_stats, binned)
        });

        let mut band_output = Vec::with_capacity(window.size().cell_count());
        let mut band_classes = Vec::new();
        for (output, row_stats, binned) in rows {
            band_output.extend(output);
            stats.merge_band(band_index, &row_stats);

            if let (Some(hist), Some((classes, row_hist))) = (histogram.as_mut(), binned) {
                hist.merge(&row_hist)?;
                band_classes.extend(classes);
            }
        }

        output_bands.push(band_output);
        if histogram.is_some() {
            discretized_bands.push(band_classes);
        }
    }

    if stats.diff.is_empty() {
        log::warn!("No valid pixel pairs in the overlap of the rasters");
    }

    let discretized = if histogram.is_some() {
        Some(RasterGrid::new(aligned.grid().clone(), discretized_bands)?.with_nodata(Some(DISCRETIZED_NODATA)))
    } else {
        None
    };

    Ok(DiffResult {
        raster: RasterGrid::new(aligned.grid().clone(), output_bands)?.with_nodata(Some(f64::NAN)),
        summary: DiffSummary {
            pix_area_1,
            pix_area_2,
            stats,
        },
        histogram,
        discretized,
    })
}
