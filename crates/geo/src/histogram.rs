//! Fixed width histograms with overflow counters below the minimum and above the maximum.

use crate::{Error, Result};

/// Binning of the `[min, max)` interval in bins of equal width.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistogramConfig {
    min: f64,
    max: f64,
    step: f64,
    len: usize,
}

/// Location of a value relative to the bins of a [`HistogramConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistBin {
    Min,
    Max,
    Bin(usize),
}

impl HistogramConfig {
    /// Bins of width `step`, the last bin is truncated at `max`
    pub fn from_min_max_step(min: f64, max: f64, step: f64) -> Result<Self> {
        check_range(min, max)?;
        if !step.is_finite() || step <= 0.0 {
            return Err(Error::InvalidArgument(format!("Histogram step must be positive, got {step}")));
        }

        Ok(HistogramConfig {
            min,
            max,
            step,
            len: ((max - min) / step).ceil() as usize,
        })
    }

    pub fn from_min_max_bins(min: f64, max: f64, bins: usize) -> Result<Self> {
        check_range(min, max)?;
        if bins == 0 {
            return Err(Error::InvalidArgument("Histogram needs at least one bin".into()));
        }

        Ok(HistogramConfig {
            min,
            max,
            step: (max - min) / bins as f64,
            len: bins,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    #[inline]
    pub fn bin_for(&self, value: f64) -> HistBin {
        if value >= self.max {
            HistBin::Max
        } else if value < self.min {
            HistBin::Min
        } else {
            match ((value - self.min) / self.step).floor() as usize {
                bin if bin >= self.len => HistBin::Max,
                bin => HistBin::Bin(bin),
            }
        }
    }

    /// Integer class of a value: -1 below the minimum, the bin index inside the range, the bin count above the maximum
    pub fn class_for(&self, value: f64) -> i64 {
        match self.bin_for(value) {
            HistBin::Min => -1,
            HistBin::Bin(bin) => bin as i64,
            HistBin::Max => self.len as i64,
        }
    }
}

fn check_range(min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(Error::InvalidArgument(format!("Invalid histogram range [{min}, {max}]")));
    }

    Ok(())
}

/// Value counts per bin, values outside of the range are counted in `min` (below) and `max` (at or above)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Histogram {
    config: HistogramConfig,
    hist: Vec<u64>,
    min: u64,
    max: u64,
    count: u64,
}

impl Histogram {
    pub fn new(config: HistogramConfig) -> Self {
        Histogram {
            config,
            hist: vec![0; config.len()],
            min: 0,
            max: 0,
            count: 0,
        }
    }

    pub fn add(&mut self, value: f64) {
        match self.config.bin_for(value) {
            HistBin::Min => self.min += 1,
            HistBin::Max => self.max += 1,
            HistBin::Bin(bin) => self.hist[bin] += 1,
        }
        self.count += 1;
    }

    /// Adds the counts of a histogram with the same configuration
    pub fn merge(&mut self, other: &Histogram) -> Result<()> {
        if self.config != other.config {
            return Err(Error::InvalidArgument("Histograms with different bins can not be merged".into()));
        }

        for (count, other_count) in self.hist.iter_mut().zip(&other.hist) {
            *count += other_count;
        }
        self.min += other.min;
        self.max += other.max;
        self.count += other.count;
        Ok(())
    }

    pub fn config(&self) -> &HistogramConfig {
        &self.config
    }

    pub fn bins(&self) -> &[u64] {
        &self.hist
    }

    pub fn below_min(&self) -> u64 {
        self.min
    }

    pub fn above_max(&self) -> u64 {
        self.max
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl std::ops::AddAssign<f64> for Histogram {
    fn add_assign(&mut self, value: f64) {
        self.add(value);
    }
}
