//! Axis aligned rectangles in world coordinates.

use approx::{AbsDiffEq, RelativeEq};

use crate::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    min: Point,
    max: Point,
}

impl WorldRect {
    /// Creates the rectangle spanned by two opposite corners, in any order
    pub fn from_points(p1: Point, p2: Point) -> Self {
        WorldRect {
            min: Point::new(p1.x().min(p2.x()), p1.y().min(p2.y())),
            max: Point::new(p1.x().max(p2.x()), p1.y().max(p2.y())),
        }
    }

    /// The bounding box of a set of points, `None` for an empty set
    pub fn bounding_box(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        points.into_iter().fold(None, |rect: Option<WorldRect>, p| {
            Some(match rect {
                Some(r) => WorldRect::from_points(
                    Point::new(r.min.x().min(p.x()), r.min.y().min(p.y())),
                    Point::new(r.max.x().max(p.x()), r.max.y().max(p.y())),
                ),
                None => WorldRect::from_points(p, p),
            })
        })
    }

    pub fn min_x(&self) -> f64 {
        self.min.x()
    }

    pub fn min_y(&self) -> f64 {
        self.min.y()
    }

    pub fn max_x(&self) -> f64 {
        self.max.x()
    }

    pub fn max_y(&self) -> f64 {
        self.max.y()
    }

    pub fn width(&self) -> f64 {
        self.max.x() - self.min.x()
    }

    pub fn height(&self) -> f64 {
        self.max.y() - self.min.y()
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Rectangles that only share an edge do not intersect
    pub fn intersects(&self, other: &WorldRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x() < other.max.x()
            && self.max.x() > other.min.x()
            && self.min.y() < other.max.y()
            && self.max.y() > other.min.y()
    }

    pub fn intersection(&self, other: &WorldRect) -> Option<WorldRect> {
        if !self.intersects(other) {
            return None;
        }

        Some(WorldRect {
            min: Point::new(self.min.x().max(other.min.x()), self.min.y().max(other.min.y())),
            max: Point::new(self.max.x().min(other.max.x()), self.max.y().min(other.max.y())),
        })
    }
}

impl AbsDiffEq for WorldRect {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.min.abs_diff_eq(&other.min, epsilon) && self.max.abs_diff_eq(&other.max, epsilon)
    }
}

impl RelativeEq for WorldRect {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: Self::Epsilon, max_relative: Self::Epsilon) -> bool {
        Point::relative_eq(&self.min, &other.min, epsilon, max_relative) && Point::relative_eq(&self.max, &other.max, epsilon, max_relative)
    }
}
