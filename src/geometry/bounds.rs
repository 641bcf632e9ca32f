//! Axis-aligned map boundary.
//!
//! [`BoundingBox`] is the fixed boundary the road generator works inside. It
//! answers two questions that gate node acceptance: does a point lie in the
//! map, and does a road quad touch or cross the boundary ring. Both are exact
//! at double precision.

use super::point::{point_in_polygon, segments_intersect, Point2D};
use super::polygon::RoadPolygon;
use crate::error::{Error, Result};

/// Immutable axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    min: Point2D,
    max: Point2D,
}

impl BoundingBox {
    /// Create a bounding box from min/max corners
    pub fn new(min: Point2D, max: Point2D) -> Result<Self> {
        if min.x >= max.x || min.y >= max.y {
            return Err(Error::InvalidConfig(format!(
                "degenerate bounding box: ({}, {})..({}, {})",
                min.x, min.y, max.x, max.y
            )));
        }
        Ok(Self { min, max })
    }

    /// Create from `[min_x, min_y, max_x, max_y]` extents
    pub fn from_extents(extents: [f64; 4]) -> Result<Self> {
        Self::new(
            Point2D::new(extents[0], extents[1]),
            Point2D::new(extents[2], extents[3]),
        )
    }

    /// Closed-interval point containment
    #[inline]
    pub fn contains_point(&self, p: Point2D) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Corners in CCW order starting from min
    #[inline]
    pub fn corners(&self) -> [Point2D; 4] {
        [
            self.min,
            Point2D::new(self.max.x, self.min.y),
            self.max,
            Point2D::new(self.min.x, self.max.y),
        ]
    }

    /// The four boundary edges
    fn edges(&self) -> [(Point2D, Point2D); 4] {
        let c = self.corners();
        [(c[0], c[1]), (c[1], c[2]), (c[2], c[3]), (c[3], c[0])]
    }

    /// Whether a road quad touches or crosses the boundary ring.
    ///
    /// True when any quad edge meets any boundary edge, or the quad swallows
    /// a boundary corner. A quad fully inside or fully outside the box does
    /// not intersect the ring.
    pub fn intersects_boundary(&self, quad: &[Point2D; 4]) -> bool {
        for (ba, bb) in self.edges() {
            for i in 0..4 {
                let qa = quad[i];
                let qb = quad[(i + 1) % 4];
                if segments_intersect(qa, qb, ba, bb) {
                    return true;
                }
            }
        }
        self.corners()
            .iter()
            .any(|&c| point_in_polygon(c, quad, true))
    }

    /// Whether the whole extruded road polygon lies within the box
    pub fn contains_polygon(&self, polygon: &RoadPolygon) -> bool {
        polygon.vertices().all(|p| self.contains_point(p))
    }
}
