use crate::core::geo::Point;
use crate::traits::GeometryOps;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world or screen pixels (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle from its two corners
    pub fn from_corners(min: Point, max: Point) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn min(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn max(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    /// No positive area
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Overlapping region, `None` unless it has positive area
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        let rect = Rect::new(x0, y0, x1 - x0, y1 - y0);
        if rect.is_empty() {
            None
        } else {
            Some(rect)
        }
    }

    /// Grows the rectangle by `margin` on every side
    pub fn expand(&self, margin: f64) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Checks that `other` lies entirely inside this rectangle (within `eps`)
    pub fn contains_rect(&self, other: &Rect, eps: f64) -> bool {
        other.x >= self.x - eps
            && other.y >= self.y - eps
            && other.right() <= self.right() + eps
            && other.bottom() <= self.bottom() + eps
    }
}

impl GeometryOps<Point> for Rect {
    fn contains_point(&self, point: &Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    fn intersects_bounds(&self, other: &Self) -> bool {
        self.intersection(other).is_some()
    }

    fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }

    fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width * self.height
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 25.0, 100.0, 50.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(50.0, 25.0, 50.0, 50.0)));

        // touching edges share no area
        let c = Rect::new(100.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection(&c), None);
        assert!(!a.intersects_bounds(&c));
    }

    #[test]
    fn test_contains_and_area() {
        let r = Rect::new(10.0, 10.0, 20.0, 30.0);
        assert!(r.contains_point(&Point::new(10.0, 40.0)));
        assert!(!r.contains_point(&Point::new(31.0, 20.0)));
        assert_eq!(r.area(), 600.0);
        assert_eq!(r.center(), Point::new(20.0, 25.0));
        assert!(r.expand(5.0).contains_rect(&r, 0.0));
        assert_eq!(Rect::new(0.0, 0.0, -1.0, 5.0).area(), 0.0);
    }
}
