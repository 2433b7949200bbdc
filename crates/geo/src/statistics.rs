use std::ops::AddAssign;

use crate::NodataPolicy;

/// Mergeable running statistic over a stream of values.
///
/// Only the raw quantities are tracked, derived statistics (mean, variance) are left to the caller.
/// Merging is associative and commutative, so values can be accumulated in independent blocks and combined in any order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatAccumulator {
    max: Option<f64>,
    min: Option<f64>,
    sum: f64,
    sum_2: f64,
    count: u64,
}

impl StatAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate the value, unless it is nodata according to the policy
    #[inline]
    pub fn update(&mut self, value: f64, nodata: &NodataPolicy) {
        if !nodata.is_nodata(value) {
            self.add(value);
        }
    }

    /// Accumulate the value unconditionally
    #[inline]
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_2 += value * value;
        self.min = Some(self.min.map_or(value, |min| min.min(value)));
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
    }

    pub fn merge(a: &StatAccumulator, b: &StatAccumulator) -> StatAccumulator {
        let mut result = *a;
        result.merge_from(b);
        result
    }

    pub fn merge_from(&mut self, other: &StatAccumulator) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_2 += other.sum_2;
        self.min = merge_option(self.min, other.min, f64::min);
        self.max = merge_option(self.max, other.max, f64::max);
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Sum of the squared values
    pub fn sum_2(&self) -> f64 {
        self.sum_2
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }
}

fn merge_option(a: Option<f64>, b: Option<f64>, combine: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(combine(a, b)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl AddAssign<&StatAccumulator> for StatAccumulator {
    fn add_assign(&mut self, rhs: &StatAccumulator) {
        self.merge_from(rhs);
    }
}

impl FromIterator<f64> for StatAccumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = StatAccumulator::new();
        iter.into_iter().for_each(|v| acc.add(v));
        acc
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::distr::{Distribution, Uniform};

    use super::*;

    fn random_values(count: usize) -> Vec<f64> {
        let mut rng = rand::rng();
        let uniform = Uniform::new_inclusive(-1000.0, 1000.0).expect("Failed to create uniform distribution");
        (0..count).map(|_| uniform.sample(&mut rng)).collect()
    }

    fn assert_accumulators_close(a: &StatAccumulator, b: &StatAccumulator) {
        assert_eq!(a.count(), b.count());
        assert_eq!(a.min(), b.min());
        assert_eq!(a.max(), b.max());
        assert_relative_eq!(a.sum(), b.sum(), epsilon = 1e-6, max_relative = 1e-12);
        assert_relative_eq!(a.sum_2(), b.sum_2(), epsilon = 1e-6, max_relative = 1e-12);
    }

    #[test]
    fn accumulate_values() {
        let acc: StatAccumulator = [3.0, 1.0, 4.0, 1.0, 5.0].into_iter().collect();
        assert_eq!(acc.count(), 5);
        assert_eq!(acc.sum(), 14.0);
        assert_eq!(acc.sum_2(), 52.0);
        assert_eq!(acc.min(), Some(1.0));
        assert_eq!(acc.max(), Some(5.0));
    }

    #[test]
    fn nodata_values_are_skipped() {
        let policy = NodataPolicy::with_sentinel(255.0);
        let mut acc = StatAccumulator::new();
        for v in [255.0, 2.0, f64::NAN, -2.0, 255.0] {
            acc.update(v, &policy);
        }

        assert_eq!(acc.count(), 2);
        assert_eq!(acc.sum(), 0.0);
        assert_eq!(acc.sum_2(), 8.0);
        assert_eq!(acc.min(), Some(-2.0));
        assert_eq!(acc.max(), Some(2.0));
    }

    #[test]
    fn empty_accumulator() {
        let acc = StatAccumulator::new();
        assert!(acc.is_empty());
        assert_eq!(acc.min(), None);
        assert_eq!(acc.max(), None);

        let merged = StatAccumulator::merge(&acc, &acc);
        assert!(merged.is_empty());
        assert_eq!(merged.min(), None);
        assert_eq!(merged.max(), None);

        let values: StatAccumulator = [-1.0, 7.0].into_iter().collect();
        assert_eq!(StatAccumulator::merge(&acc, &values), values);
        assert_eq!(StatAccumulator::merge(&values, &acc), values);
    }

    #[test]
    fn merge_is_commutative() {
        let a: StatAccumulator = random_values(100).into_iter().collect();
        let b: StatAccumulator = random_values(37).into_iter().collect();

        assert_eq!(StatAccumulator::merge(&a, &b), StatAccumulator::merge(&b, &a));
    }

    #[test]
    fn merge_is_associative() {
        let a: StatAccumulator = random_values(100).into_iter().collect();
        let b: StatAccumulator = random_values(1).into_iter().collect();
        let c: StatAccumulator = random_values(250).into_iter().collect();
        let empty = StatAccumulator::new();

        let left = StatAccumulator::merge(&StatAccumulator::merge(&a, &b), &c);
        let right = StatAccumulator::merge(&a, &StatAccumulator::merge(&b, &c));
        assert_accumulators_close(&left, &right);

        let left = StatAccumulator::merge(&StatAccumulator::merge(&a, &empty), &c);
        let right = StatAccumulator::merge(&a, &StatAccumulator::merge(&empty, &c));
        assert_accumulators_close(&left, &right);
    }

    #[test]
    fn partition_matches_single_pass() {
        let values = random_values(1000);
        let single_pass: StatAccumulator = values.iter().copied().collect();

        for block_size in [1, 7, 64, 999, 1000, 4096] {
            let merged = values
                .chunks(block_size)
                .map(|block| block.iter().copied().collect::<StatAccumulator>())
                .fold(StatAccumulator::new(), |mut acc, block| {
                    acc += &block;
                    acc
                });

            assert_accumulators_close(&single_pass, &merged);
        }
    }

    #[test]
    fn add_values_in_place() {
        let mut per_band = vec![StatAccumulator::new(); 2];
        per_band[1].add(4.0);
        per_band[1].add(-2.0);
        for acc in per_band.iter_mut() {
            acc.add(1.0);
        }

        assert_eq!(per_band[0].count(), 1);
        assert_eq!(per_band[1].count(), 3);
        assert_eq!(per_band[1].sum(), 3.0);
        assert_eq!(per_band[1].min(), Some(-2.0));
    }

    #[test]
    fn add_assign_merges() {
        let mut acc: StatAccumulator = [1.0, 2.0].into_iter().collect();
        acc += &[10.0].into_iter().collect::<StatAccumulator>();
        assert_eq!(acc.count(), 3);
        assert_eq!(acc.max(), Some(10.0));
        assert_eq!(acc.sum(), 13.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serialized_fields() {
        let acc: StatAccumulator = [1.0, 3.0].into_iter().collect();
        assert_eq!(
            serde_json::to_string(&acc).expect("serialization"),
            r#"{"max":3.0,"min":1.0,"sum":4.0,"sum_2":10.0,"count":2}"#
        );

        assert_eq!(
            serde_json::to_string(&StatAccumulator::new()).expect("serialization"),
            r#"{"max":null,"min":null,"sum":0.0,"sum_2":0.0,"count":0}"#
        );
    }
}
