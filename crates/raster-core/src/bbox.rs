//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A projected or geographic bounding box in coordinate units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if this bbox intersects another with positive area.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Compute the intersection of two bounding boxes.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }

        Some(BoundingBox {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Compute the bounding union of two bounding boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));

        let intersection = a.intersection(&b).unwrap();
        assert_eq!(intersection.min_x, 5.0);
        assert_eq!(intersection.min_y, 5.0);
        assert_eq!(intersection.max_x, 10.0);
        assert_eq!(intersection.max_y, 10.0);
    }

    #[test]
    fn test_touching_boxes_do_not_intersect() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);

        assert!(!a.intersects(&b));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_union() {
        let a = BoundingBox::new(2.0, 48.0, 3.0, 49.0);
        let b = BoundingBox::new(3.0, 48.0, 4.0, 49.0);

        let u = a.union(&b);
        assert_eq!(u.min_x, 2.0);
        assert_eq!(u.max_x, 4.0);
        assert_eq!(u.min_y, 48.0);
        assert_eq!(u.max_y, 49.0);
    }

    #[test]
    fn test_dimensions() {
        let bbox = BoundingBox::new(440600.0, 3750060.0, 441860.0, 3751260.0);
        assert!((bbox.width() - 1260.0).abs() < f64::EPSILON);
        assert!((bbox.height() - 1200.0).abs() < f64::EPSILON);
    }
}
