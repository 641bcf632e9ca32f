//! Geometry primitives gating road acceptance
//!
//! Pure functions and types with no shared state: exact point/segment
//! predicates, the map bounding box, the width-extruded road polygon, and
//! Catmull-Rom centerline interpolation.

mod bounds;
mod point;
mod polygon;
mod spline;

pub use bounds::BoundingBox;
pub use point::Point2D;
pub use polygon::RoadPolygon;
pub use spline::catmull_rom_chain;
