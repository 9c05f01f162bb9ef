//! Stateless kernel predicates used by every placement routine.

use nalgebra::Vector2;

use super::types::{GeomTol, Segment};

/// Proper-crossing test via the parametric cross-product formulation.
///
/// Solves the 2x2 system for the intersection parameters `(t, u)` of the two
/// supporting lines; the segments cross iff both parameters lie strictly
/// inside `(tol.t_min, 1 - tol.t_min)`. Touching exactly at an endpoint is
/// not a crossing. Near-parallel pairs (`|denom| < eps_parallel`) report no
/// crossing; collinear overlap is not detected.
pub fn segments_cross(a: &Segment, b: &Segment, tol: GeomTol) -> bool {
    let (x1, y1) = (a.start.x, a.start.y);
    let (x2, y2) = (a.end.x, a.end.y);
    let (x3, y3) = (b.start.x, b.start.y);
    let (x4, y4) = (b.end.x, b.end.y);

    let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if denom.abs() < tol.eps_parallel {
        return false;
    }

    let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / denom;
    let u = -((x1 - x2) * (y1 - y3) - (y1 - y2) * (x1 - x3)) / denom;

    let lo = tol.t_min;
    let hi = 1.0 - tol.t_min;
    t > lo && t < hi && u > lo && u < hi
}

/// Distance from `p` to the closest point of the segment `start..end`.
///
/// Projects `p` onto the supporting line and clamps the parameter to
/// `[0, 1]`; zero-length segments degrade to plain point distance.
pub fn point_segment_distance(p: Vector2<f64>, start: Vector2<f64>, end: Vector2<f64>) -> f64 {
    let d = end - start;
    let len2 = d.norm_squared();
    if len2 == 0.0 {
        return (p - start).norm();
    }
    let t = ((p - start).dot(&d) / len2).clamp(0.0, 1.0);
    (p - (start + d * t)).norm()
}
