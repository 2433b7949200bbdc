use crate::{CellIterator, NodataPolicy, PixelWindow, RasterGrid, StatAccumulator};

use super::ordered_map;

/// Number of raster rows processed by a single task
pub const DEFAULT_BLOCK_ROWS: usize = 64;

/// Per band statistics of the pixels inside the window, skipping nodata.
/// A pixel is skipped entirely when it matches the `zero_is_nodata` rule of the policy.
pub fn scan_window(raster: &RasterGrid, nodata: &NodataPolicy, window: &PixelWindow) -> Vec<StatAccumulator> {
    let mut stats = vec![StatAccumulator::new(); raster.band_count()];
    let cols = raster.cols();
    let col_end = (window.col_offset + window.cols).min(cols);
    let row_end = (window.row_offset + window.rows).min(raster.rows());

    for row in window.row_offset..row_end {
        for col in window.col_offset.min(col_end)..col_end {
            let index = row * cols + col;
            if nodata.zero_is_nodata && nodata.is_nodata_pixel(raster.bands().iter().map(|band| band[index])) {
                continue;
            }

            for (acc, band) in stats.iter_mut().zip(raster.bands()) {
                acc.update(band[index], nodata);
            }
        }
    }

    stats
}

fn scan_rows(raster: &RasterGrid, nodata: &NodataPolicy, rows: std::ops::Range<usize>) -> Vec<StatAccumulator> {
    let mut stats = vec![StatAccumulator::new(); raster.band_count()];
    for cell in CellIterator::for_rows(raster.size(), rows) {
        if nodata.is_nodata_pixel(raster.pixel(cell)) {
            continue;
        }

        let index = cell.index_in_raster(raster.cols());
        for (acc, band) in stats.iter_mut().zip(raster.bands()) {
            acc.update(band[index], nodata);
        }
    }

    stats
}

pub fn band_statistics(raster: &RasterGrid, nodata: &NodataPolicy) -> Vec<StatAccumulator> {
    band_statistics_with_block_rows(raster, nodata, DEFAULT_BLOCK_ROWS)
}

/// Per band statistics, the raster is split in blocks of `block_rows` rows that are processed independently.
/// The block results are merged in row order so the result does not depend on the number of threads.
pub fn band_statistics_with_block_rows(raster: &RasterGrid, nodata: &NodataPolicy, block_rows: usize) -> Vec<StatAccumulator> {
    let block_rows = block_rows.max(1);
    let block_count = raster.rows().div_ceil(block_rows);

    let blocks = ordered_map(0..block_count, |block| {
        let start = block * block_rows;
        scan_rows(raster, nodata, start..(start + block_rows).min(raster.rows()))
    });

    log::debug!("Merging statistics of {block_count} row blocks");
    blocks
        .iter()
        .fold(vec![StatAccumulator::new(); raster.band_count()], |mut total, block| {
            for (acc, block_acc) in total.iter_mut().zip(block) {
                acc.merge_from(block_acc);
            }
            total
        })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::{
        GeoGrid, GeoTransform, RasterSize, Result,
        testutils::{self, NOD},
    };

    use super::*;

    fn raster_3x2(bands: Vec<Vec<f64>>) -> Result<RasterGrid> {
        let grid = GeoGrid::new(
            "",
            RasterSize::with_rows_cols(3, 2),
            GeoTransform::new([0.0, 100.0, 0.0, 300.0, 0.0, -100.0]),
        );
        Ok(RasterGrid::new(grid, bands)?.with_nodata(Some(NOD)))
    }

    #[test]
    fn statistics_with_nodata() -> Result<()> {
        #[rustfmt::skip]
        let raster = raster_3x2(vec![vec![
            3.0, 2.0,
            4.0, 7.0,
            1.0, NOD,
        ]])?;

        let stats = band_statistics(&raster, &raster.nodata_policy());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].count(), 5);
        assert_eq!(stats[0].min(), Some(1.0));
        assert_eq!(stats[0].max(), Some(7.0));
        assert_eq!(stats[0].sum(), 17.0);
        assert_eq!(stats[0].sum_2(), 79.0);
        Ok(())
    }

    #[test]
    fn statistics_all_nodata() -> Result<()> {
        let raster = raster_3x2(vec![vec![NOD; 6]])?;
        let stats = band_statistics(&raster, &raster.nodata_policy());
        assert!(stats[0].is_empty());
        assert_eq!(stats[0].min(), None);
        Ok(())
    }

    #[test]
    fn infinite_values_are_skipped() -> Result<()> {
        #[rustfmt::skip]
        let raster = raster_3x2(vec![vec![
            1.0, f64::INFINITY,
            3.0, 4.0,
            f64::NEG_INFINITY, NOD,
        ]])?;

        let stats = band_statistics(&raster, &raster.nodata_policy());
        assert_eq!(stats[0].count(), 3);
        assert_eq!(stats[0].max(), Some(4.0));
        assert_eq!(stats[0].sum(), 8.0);

        #[cfg(feature = "serde")]
        assert!(!serde_json::to_string(&stats).expect("serialization").contains("null"));
        Ok(())
    }

    #[test]
    fn zero_pixels_are_skipped_over_all_bands() -> Result<()> {
        #[rustfmt::skip]
        let raster = raster_3x2(vec![
            vec![
                0.0, 1.0,
                0.0, 0.0,
                2.0, 0.0,
            ],
            vec![
                0.0, 0.0,
                5.0, 0.0,
                0.0, 0.0,
            ],
        ])?;

        let policy = NodataPolicy::default().zero_is_nodata(true);
        let stats = band_statistics(&raster, &policy);
        assert_eq!(stats[0].count(), 3);
        assert_eq!(stats[1].count(), 3);
        assert_eq!(stats[0].sum(), 3.0);
        assert_eq!(stats[1].sum(), 5.0);
        assert_eq!(stats[1].min(), Some(0.0));

        let window_stats = scan_window(&raster, &policy, &PixelWindow::new(0, 0, 3, 2));
        assert_eq!(window_stats, stats);
        Ok(())
    }

    #[test]
    fn window_scan() -> Result<()> {
        #[rustfmt::skip]
        let raster = raster_3x2(vec![vec![
            3.0, 2.0,
            4.0, 7.0,
            1.0, NOD,
        ]])?;

        let stats = scan_window(&raster, &raster.nodata_policy(), &PixelWindow::new(1, 1, 4, 4));
        assert_eq!(stats[0].count(), 1);
        assert_eq!(stats[0].sum(), 7.0);
        Ok(())
    }

    #[test]
    fn block_size_does_not_change_result() {
        let raster = testutils::random_raster(RasterSize::with_rows_cols(97, 31), 2, -10.0..=10.0);
        let policy = NodataPolicy::default();
        let reference = band_statistics_with_block_rows(&raster, &policy, raster.rows());

        for block_rows in [1, 3, 64, 200] {
            let stats = band_statistics_with_block_rows(&raster, &policy, block_rows);
            for (a, b) in stats.iter().zip(&reference) {
                assert_eq!(a.count(), b.count());
                assert_eq!(a.min(), b.min());
                assert_eq!(a.max(), b.max());
                assert_relative_eq!(a.sum(), b.sum(), epsilon = 1e-9);
                assert_relative_eq!(a.sum_2(), b.sum_2(), epsilon = 1e-9, max_relative = 1e-12);
            }
        }
    }

    #[test_log::test]
    fn standard_normal_samples() {
        let raster = testutils::normal_raster(RasterSize::square(64));
        let stats = band_statistics(&raster, &NodataPolicy::default());

        let values = raster.band(0).expect("band");
        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let std = (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count).sqrt();

        assert_eq!(stats[0].count(), 4096);
        assert_relative_eq!((stats[0].sum_2() / stats[0].count() as f64).sqrt(), std, max_relative = 1e-2);
    }
}
