//! Planar point type and exact segment predicates.
//!
//! All predicates use sign-of-orientation tests at full double precision with
//! no tolerance; they gate road acceptance, so a fuzzy answer here would let
//! invalid geometry through.

use serde::{Deserialize, Serialize};

/// Planar point in world coordinates (f64)
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    /// Create a new point
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance(&self, other: &Point2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Signed area of the triangle (a, b, c); positive when c lies left of a->b
#[inline]
pub fn orient(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Whether p lies on the closed segment a-b, assuming the three are collinear
#[inline]
fn on_segment(a: Point2D, b: Point2D, p: Point2D) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Closed segment intersection: touching endpoints and collinear overlap count
pub fn segments_intersect(a: Point2D, b: Point2D, c: Point2D, d: Point2D) -> bool {
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);

    if ((o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0))
        && ((o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0))
    {
        return true;
    }

    (o1 == 0.0 && on_segment(a, b, c))
        || (o2 == 0.0 && on_segment(a, b, d))
        || (o3 == 0.0 && on_segment(c, d, a))
        || (o4 == 0.0 && on_segment(c, d, b))
}

/// Proper crossing only: the segments meet at a single interior point of both
pub fn segments_cross(a: Point2D, b: Point2D, c: Point2D, d: Point2D) -> bool {
    let o1 = orient(a, b, c);
    let o2 = orient(a, b, d);
    let o3 = orient(c, d, a);
    let o4 = orient(c, d, b);

    ((o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0))
        && ((o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0))
}

/// Ray-cast containment test for a simple polygon given as a vertex ring.
///
/// `include_boundary` selects whether points on an edge count as inside.
pub fn point_in_polygon(p: Point2D, ring: &[Point2D], include_boundary: bool) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        if orient(a, b, p) == 0.0 && on_segment(a, b, p) {
            return include_boundary;
        }
    }

    let mut inside = false;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn test_segments_cross() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(10.0, 10.0);
        let c = Point2D::new(0.0, 10.0);
        let d = Point2D::new(10.0, 0.0);
        assert!(segments_cross(a, b, c, d));
        assert!(segments_intersect(a, b, c, d));
    }

    #[test]
    fn test_touching_endpoint_is_not_a_proper_cross() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(10.0, 0.0);
        let c = Point2D::new(10.0, 0.0);
        let d = Point2D::new(10.0, 10.0);
        assert!(!segments_cross(a, b, c, d));
        assert!(segments_intersect(a, b, c, d));
    }

    #[test]
    fn test_collinear_overlap() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(10.0, 0.0);
        let c = Point2D::new(5.0, 0.0);
        let d = Point2D::new(15.0, 0.0);
        assert!(segments_intersect(a, b, c, d));
        assert!(!segments_cross(a, b, c, d));
    }

    #[test]
    fn test_disjoint_segments() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(1.0, 0.0);
        let c = Point2D::new(2.0, 1.0);
        let d = Point2D::new(3.0, 1.0);
        assert!(!segments_intersect(a, b, c, d));
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(Point2D::new(5.0, 5.0), &square, false));
        assert!(!point_in_polygon(Point2D::new(15.0, 5.0), &square, false));
        // Boundary point respects the flag
        assert!(point_in_polygon(Point2D::new(0.0, 5.0), &square, true));
        assert!(!point_in_polygon(Point2D::new(0.0, 5.0), &square, false));
    }
}
