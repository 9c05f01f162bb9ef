//! Segment type and the tolerance knobs used by the kernel predicates.

use nalgebra::Vector2;

/// Tolerances for the segment predicates.
#[derive(Clone, Copy, Debug)]
pub struct GeomTol {
    /// Parametric denominators below this are treated as parallel
    /// (no crossing reported, collinear overlap included).
    pub eps_parallel: f64,
    /// Open-interval margin for the crossing parameters: a crossing requires
    /// both parameters inside `(t_min, 1 - t_min)`.
    pub t_min: f64,
}

impl Default for GeomTol {
    fn default() -> Self {
        Self {
            eps_parallel: 1e-10,
            t_min: 0.01,
        }
    }
}

/// Line segment with ordered endpoints.
///
/// Orientation is incidental: swapping the endpoints changes nothing under
/// the crossing and clearance predicates, and such segments compare equal.
#[derive(Clone, Copy, Debug)]
pub struct Segment {
    pub start: Vector2<f64>,
    pub end: Vector2<f64>,
}

impl Segment {
    #[inline]
    pub fn new(start: Vector2<f64>, end: Vector2<f64>) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        (self.start == other.start && self.end == other.end)
            || (self.start == other.end && self.end == other.start)
    }
}
