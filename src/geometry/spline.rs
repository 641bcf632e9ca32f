//! Catmull-Rom centerline interpolation.
//!
//! Chord-length parameterized Catmull-Rom over a chain of control points.
//! Each four-point window contributes `samples_per_segment` evenly
//! t-parameterized points over `[t1, t2)`; the final window's end point is
//! appended once, so the curve runs from the second control point to the
//! second-to-last, passing through every interior control point exactly and
//! never duplicating shared window endpoints.

use super::point::Point2D;
use crate::error::{Error, Result};

/// Minimum chain length for one interpolation window
const MIN_CHAIN: usize = 4;

/// Interpolate a full chain. A chain of `k` points yields
/// `(k - 3) * samples_per_segment + 1` samples.
pub fn catmull_rom_chain(points: &[Point2D], samples_per_segment: usize) -> Result<Vec<Point2D>> {
    if points.len() < MIN_CHAIN {
        return Err(Error::InvalidParameter(format!(
            "spline needs at least {} control points, got {}",
            MIN_CHAIN,
            points.len()
        )));
    }
    if samples_per_segment == 0 {
        return Err(Error::InvalidParameter(
            "samples_per_segment must be positive".to_string(),
        ));
    }

    let windows = points.len() - 3;
    let mut out = Vec::with_capacity(windows * samples_per_segment + 1);
    for w in points.windows(4) {
        sample_window(w[0], w[1], w[2], w[3], samples_per_segment, &mut out)?;
    }
    // Close the curve exactly on the last interior control point
    out.push(points[points.len() - 2]);
    Ok(out)
}

/// Sample one window over [t1, t2), excluding the end knot
fn sample_window(
    p0: Point2D,
    p1: Point2D,
    p2: Point2D,
    p3: Point2D,
    n: usize,
    out: &mut Vec<Point2D>,
) -> Result<()> {
    let t0 = 0.0;
    let t1 = t0 + p0.distance(&p1);
    let t2 = t1 + p1.distance(&p2);
    let t3 = t2 + p2.distance(&p3);

    if t1 == t0 || t2 == t1 || t3 == t2 {
        return Err(Error::InvalidParameter(
            "coincident control points break spline parameterization".to_string(),
        ));
    }

    for k in 0..n {
        let t = t1 + (t2 - t1) * (k as f64 / n as f64);

        let a1 = lerp(p0, p1, t0, t1, t);
        let a2 = lerp(p1, p2, t1, t2, t);
        let a3 = lerp(p2, p3, t2, t3, t);
        let b1 = lerp(a1, a2, t0, t2, t);
        let b2 = lerp(a2, a3, t1, t3, t);
        out.push(lerp(b1, b2, t1, t2, t));
    }
    Ok(())
}

/// Barycentric blend of two points over the knot interval [ta, tb]
#[inline]
fn lerp(a: Point2D, b: Point2D, ta: f64, tb: f64, t: f64) -> Point2D {
    let wa = (tb - t) / (tb - ta);
    let wb = (t - ta) / (tb - ta);
    Point2D::new(wa * a.x + wb * b.x, wa * a.y + wb * b.y)
}
