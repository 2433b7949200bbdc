//! Raster algorithms built on the alignment and statistics primitives.

mod bandstats;
mod diff;
mod mask;

use std::ops::Range;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

pub use bandstats::{DEFAULT_BLOCK_ROWS, band_statistics, band_statistics_with_block_rows, scan_window};
pub use diff::{DISCRETIZED_NODATA, DiffOptions, DiffResult, DiffStats, DiffSummary, diff};
pub use mask::{mask, mask_with_value};

/// Maps `f` over the indexes in `range`, in parallel when the `rayon` feature is enabled.
/// The order of the results always matches the order of the indexes.
pub(crate) fn ordered_map<T, F>(range: Range<usize>, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            range.into_par_iter().map(f).collect()
        } else {
            range.map(f).collect()
        }
    }
}
