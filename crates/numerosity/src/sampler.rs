//! Dot placement via sequential rejection sampling.
//!
//! Model
//! - Dots are drawn one at a time on the integer pixel lattice inside the
//!   boundary-adjusted rectangle; a draw is accepted iff it keeps the minimum
//!   spacing to every dot already placed.
//! - Greedy and non-backtracking: an unlucky early placement can make a later
//!   dot unplaceable. Exhausting the per-dot budget therefore aborts the whole
//!   pattern, and the caller retries with a fresh layout instead of repairing
//!   locally.

use std::fmt;

use nalgebra::Vector2;
use rand::Rng;

/// Field geometry and placement limits.
///
/// Coordinates are pattern-local pixels with the origin at the pattern
/// center, so the placement rectangle is symmetric around zero.
#[derive(Clone, Copy, Debug)]
pub struct FieldCfg {
    /// Pattern width in pixels.
    pub width: f64,
    /// Pattern height in pixels.
    pub height: f64,
    /// Minimum pairwise dot spacing.
    pub min_dot_distance: f64,
    /// Margin kept free along each pattern edge.
    pub boundary_margin: f64,
    /// Redraw budget per dot before the pattern is abandoned.
    pub max_attempts_per_dot: u32,
}

impl Default for FieldCfg {
    fn default() -> Self {
        Self {
            width: 280.0,
            height: 360.0,
            min_dot_distance: 42.0,
            boundary_margin: 20.0,
            max_attempts_per_dot: 10_000,
        }
    }
}

impl FieldCfg {
    pub fn validate(&self) -> Result<(), PlacementError> {
        if !(self.width.is_finite() && self.height.is_finite()) {
            return Err(PlacementError::invalid("field extents must be finite"));
        }
        if self.boundary_margin < 0.0 {
            return Err(PlacementError::invalid("boundary_margin must be >= 0"));
        }
        if self.width / 2.0 <= self.boundary_margin || self.height / 2.0 <= self.boundary_margin {
            return Err(PlacementError::invalid(
                "boundary margins leave no interior to place dots in",
            ));
        }
        if !(self.min_dot_distance.is_finite() && self.min_dot_distance > 0.0) {
            return Err(PlacementError::invalid(
                "min_dot_distance must be finite and positive",
            ));
        }
        if self.max_attempts_per_dot == 0 {
            return Err(PlacementError::invalid("max_attempts_per_dot must be > 0"));
        }
        Ok(())
    }

    /// Half-extents of the boundary-adjusted placement rectangle, on the
    /// integer lattice the draws use.
    pub(crate) fn half_extents(&self) -> (i64, i64) {
        (
            (self.width / 2.0 - self.boundary_margin).floor() as i64,
            (self.height / 2.0 - self.boundary_margin).floor() as i64,
        )
    }
}

/// Error type for the dot sampler.
#[derive(Debug)]
pub enum PlacementError {
    InvalidParams {
        reason: String,
    },
    /// The per-dot redraw budget ran out; the whole pattern must be retried.
    Exhausted {
        dot_index: usize,
        num_dots: usize,
        attempts: u32,
    },
}

impl PlacementError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParams { reason } => write!(f, "invalid sampler params: {reason}"),
            Self::Exhausted {
                dot_index,
                num_dots,
                attempts,
            } => write!(
                f,
                "could not place dot {}/{num_dots} within {attempts} attempts",
                dot_index + 1
            ),
        }
    }
}

impl std::error::Error for PlacementError {}

/// Place `n` dots under the spacing and boundary constraints of `cfg`.
///
/// Each dot is drawn independently with a uniform integer coordinate inside
/// the boundary-adjusted rectangle and redrawn until it clears every earlier
/// dot by `min_dot_distance`. There is no rejection of the set as a whole;
/// the only failure mode is one dot exhausting its redraw budget.
pub fn sample_dots<R: Rng>(
    n: usize,
    cfg: &FieldCfg,
    rng: &mut R,
) -> Result<Vec<Vector2<f64>>, PlacementError> {
    cfg.validate()?;
    let (hx, hy) = cfg.half_extents();

    let mut dots: Vec<Vector2<f64>> = Vec::with_capacity(n);
    'dots: for dot_index in 0..n {
        for _ in 0..cfg.max_attempts_per_dot {
            let p = Vector2::new(
                rng.gen_range(-hx..=hx) as f64,
                rng.gen_range(-hy..=hy) as f64,
            );
            if dots.iter().all(|q| (p - q).norm() >= cfg.min_dot_distance) {
                dots.push(p);
                continue 'dots;
            }
        }
        return Err(PlacementError::Exhausted {
            dot_index,
            num_dots: n,
            attempts: cfg.max_attempts_per_dot,
        });
    }
    Ok(dots)
}
