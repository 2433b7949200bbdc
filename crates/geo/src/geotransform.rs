use std::fmt::Debug;

use approx::{AbsDiffEq, RelativeEq};

use crate::{Error, Point, Result};

#[derive(Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoTransform([f64; 6]);

impl GeoTransform {
    /// Creates a new `GeoTransform` from the provided coefficients.
    ///
    /// The coefficients are in the order: [origin x, pixel width, row rotation (0 if north is up), origin y, column rotation (0 if north is up), pixel height].
    pub const fn new(coefficients: [f64; 6]) -> Self {
        GeoTransform(coefficients)
    }

    pub fn from_origin_and_pixel_size(origin: Point, pixel_width: f64, pixel_height: f64) -> Self {
        Self::new([origin.x(), pixel_width, 0.0, origin.y(), 0.0, pixel_height])
    }

    /// Translates a (fractional) pixel position to world coordinates.
    /// Position (0, 0) is the outer corner of the first pixel.
    pub fn apply(&self, col: f64, row: f64) -> Point<f64> {
        let x = self.0[0] + self.0[1] * col + self.0[2] * row;
        let y = self.0[3] + self.0[4] * col + self.0[5] * row;
        Point::new(x, y)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.0[0], self.0[3])
    }

    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    /// Negative for north-up rasters
    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }

    pub fn determinant(&self) -> f64 {
        self.0[1] * self.0[5] - self.0[2] * self.0[4]
    }

    /// World area covered by a single pixel
    pub fn pixel_area(&self) -> f64 {
        self.determinant().abs()
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }

    /// Checks the invariants of a raster transform: positive pixel width and non zero pixel height.
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|c| c.is_finite()) && self.0[1] > 0.0 && self.0[5] != 0.0
    }

    /// Returns the coefficients of the transformation.
    pub fn coefficients(&self) -> [f64; 6] {
        self.0
    }

    /// The transform of a sub grid whose first pixel is located at (`col_offset`, `row_offset`) in this grid
    pub fn translated(&self, col_offset: f64, row_offset: f64) -> Self {
        let origin = self.apply(col_offset, row_offset);
        let mut coefficients = self.0;
        coefficients[0] = origin.x();
        coefficients[3] = origin.y();
        GeoTransform(coefficients)
    }

    pub fn invert(&self) -> Result<Self> {
        let gt_in = &self.0;
        let mut gt_out = [0.0; 6];

        if gt_in[2] == 0.0 && gt_in[4] == 0.0 && gt_in[1] != 0.0 && gt_in[5] != 0.0 {
            // No rotation: avoid the determinant and its precision loss.
            // X = gt_in[0] + x * gt_in[1]
            // Y = gt_in[3] + y * gt_in[5]
            gt_out[0] = -gt_in[0] / gt_in[1];
            gt_out[1] = 1.0 / gt_in[1];
            gt_out[3] = -gt_in[3] / gt_in[5];
            gt_out[5] = 1.0 / gt_in[5];
            return Ok(gt_out.into());
        }

        // Assume a 3rd row that is [1 0 0].
        let det = self.determinant();
        let magnitude = f64::max(f64::max(gt_in[1].abs(), gt_in[2].abs()), f64::max(gt_in[4].abs(), gt_in[5].abs()));

        if !det.is_finite() || det.abs() <= 1e-10 * magnitude * magnitude {
            return Err(Error::SingularTransform);
        }

        let inv_det = 1.0 / det;

        // Adjoint divided by the determinant
        gt_out[1] = gt_in[5] * inv_det;
        gt_out[4] = -gt_in[4] * inv_det;

        gt_out[2] = -gt_in[2] * inv_det;
        gt_out[5] = gt_in[1] * inv_det;

        gt_out[0] = (gt_in[2] * gt_in[3] - gt_in[0] * gt_in[5]) * inv_det;
        gt_out[3] = (-gt_in[1] * gt_in[3] + gt_in[0] * gt_in[4]) * inv_det;

        Ok(gt_out.into())
    }
}

impl From<[f64; 6]> for GeoTransform {
    fn from(coefficients: [f64; 6]) -> Self {
        GeoTransform(coefficients)
    }
}

impl From<GeoTransform> for [f64; 6] {
    fn from(geo_trans: GeoTransform) -> [f64; 6] {
        geo_trans.0
    }
}

impl Debug for GeoTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_axis_aligned() {
            write!(
                f,
                "GeoTransform(origin: ({}, {}), pixel_width: {}, pixel_height: {})",
                self.0[0], self.0[3], self.0[1], self.0[5]
            )
        } else {
            write!(f, "GeoTransform({:?})", self.0)
        }
    }
}

impl AbsDiffEq for GeoTransform {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.0.abs_diff_eq(&other.0, epsilon)
    }
}

impl RelativeEq for GeoTransform {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: Self::Epsilon, max_relative: Self::Epsilon) -> bool {
        self.0.relative_eq(&other.0, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_relative_eq, relative_eq};

    use super::*;

    #[test]
    fn invert_north_up() -> Result<()> {
        let gt = GeoTransform::new([22000.0, 100.0, 0.0, 245000.0, 0.0, -100.0]);
        let inv = gt.invert()?;

        assert_relative_eq!(inv, GeoTransform::new([-220.0, 0.01, 0.0, 2450.0, 0.0, -0.01]));

        let p = gt.apply(3.5, 7.25);
        let back = inv.apply(p.x(), p.y());
        assert_relative_eq!(back.x(), 3.5, epsilon = 1e-9);
        assert_relative_eq!(back.y(), 7.25, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn invert_rotated() -> Result<()> {
        let gt = GeoTransform::new([10.0, 2.0, 0.5, -4.0, 0.25, -3.0]);
        let inv = gt.invert()?;

        for (col, row) in [(0.0, 0.0), (1.5, 2.5), (-3.0, 12.0)] {
            let p = gt.apply(col, row);
            let back = inv.apply(p.x(), p.y());
            assert!(relative_eq!(back.x(), col, epsilon = 1e-9));
            assert!(relative_eq!(back.y(), row, epsilon = 1e-9));
        }

        Ok(())
    }

    #[test]
    fn invert_singular() {
        let gt = GeoTransform::new([0.0, 1.0, 2.0, 0.0, 2.0, 4.0]);
        assert!(matches!(gt.invert(), Err(Error::SingularTransform)));

        let gt = GeoTransform::new([0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(matches!(gt.invert(), Err(Error::SingularTransform)));
    }

    #[test]
    fn translated_transform() {
        let gt = GeoTransform::new([-32.0, 1.0, 0.0, -32.0, 0.0, 1.0]);
        let sub = gt.translated(8.0, 4.0);
        assert_eq!(sub.origin(), Point::new(-24.0, -28.0));
        assert_eq!(sub.pixel_width(), 1.0);
        assert_eq!(sub.pixel_height(), 1.0);
    }

    #[test]
    fn validity() {
        assert!(GeoTransform::new([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]).is_valid());
        assert!(GeoTransform::new([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]).is_valid());
        assert!(!GeoTransform::new([0.0, -1.0, 0.0, 0.0, 0.0, 1.0]).is_valid());
        assert!(!GeoTransform::new([0.0, 1.0, 0.0, 0.0, 0.0, 0.0]).is_valid());
        assert!(!GeoTransform::new([f64::NAN, 1.0, 0.0, 0.0, 0.0, 1.0]).is_valid());
    }
}
