use std::ops::RangeInclusive;

use rand::distr::{Distribution, Uniform};

use crate::{GeoGrid, GeoTransform, RasterGrid, RasterSize};

pub const NOD: f64 = 255.0;

pub fn random_values(count: usize, value_range: RangeInclusive<f64>) -> Vec<f64> {
    let mut rng = rand::rng();
    let uniform = Uniform::new_inclusive(*value_range.start(), *value_range.end()).expect("Failed to create uniform distribution");
    (0..count).map(|_| uniform.sample(&mut rng)).collect()
}

/// Standard normal samples using the Box-Muller transform
pub fn normal_values(count: usize) -> Vec<f64> {
    let mut rng = rand::rng();
    let uniform = Uniform::new(f64::EPSILON, 1.0).expect("Failed to create uniform distribution");

    let mut values = Vec::with_capacity(count + 1);
    while values.len() < count {
        let u1: f64 = uniform.sample(&mut rng);
        let u2: f64 = uniform.sample(&mut rng);
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;
        values.push(radius * angle.cos());
        values.push(radius * angle.sin());
    }

    values.truncate(count);
    values
}

/// North up grid with a 10m pixel size and its origin at (0, 0)
pub fn test_grid(size: RasterSize) -> GeoGrid {
    GeoGrid::new(
        "EPSG:31370",
        size,
        GeoTransform::new([0.0, 10.0, 0.0, size.rows as f64 * 10.0, 0.0, -10.0]),
    )
}

pub fn random_raster(size: RasterSize, band_count: usize, value_range: RangeInclusive<f64>) -> RasterGrid {
    let bands = (0..band_count)
        .map(|_| random_values(size.cell_count(), value_range.clone()))
        .collect();
    RasterGrid::new(test_grid(size), bands).expect("Failed to create raster")
}

pub fn normal_raster(size: RasterSize) -> RasterGrid {
    RasterGrid::single_band(test_grid(size), normal_values(size.cell_count())).expect("Failed to create raster")
}

/// Float comparison where NaN equals NaN
pub fn compare_fp_vectors(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(a, b)| {
            if a.is_nan() || b.is_nan() {
                return a.is_nan() && b.is_nan();
            }

            approx::relative_eq!(a, b)
        })
}
