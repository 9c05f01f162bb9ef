//! Free lines: segments anchored to nothing, kept clear of every dot.

use nalgebra::Vector2;
use rand::Rng;

use crate::geom::{point_segment_distance, segments_cross, GeomTol, Segment};
use crate::sampler::FieldCfg;

use super::{LineCfg, LineLayoutError, LinePolicy};

/// Place up to `count` free lines avoiding crossings and dot contact.
///
/// Candidates are built start-first: an integer start point inside the
/// start-margin rectangle, a uniform angle in `[0, 2pi)`, a uniform length in
/// `[min_length, max_length]`. A candidate is discarded if its endpoint
/// leaves the end-margin rectangle, if it crosses any line in `existing` or
/// any line accepted earlier in this call, or if it passes a dot closer than
/// `min_dot_clearance`.
///
/// Budget exhaustion for one line follows `policy`: `Strict` aborts with
/// [`LineLayoutError::FreeExhausted`], `Lenient` warns, skips the line, and
/// moves on (the returned list may be shorter than `count`).
#[allow(clippy::too_many_arguments)]
pub fn place_free_lines<R: Rng>(
    count: usize,
    dots: &[Vector2<f64>],
    existing: &[Segment],
    field: &FieldCfg,
    cfg: &LineCfg,
    policy: LinePolicy,
    tol: GeomTol,
    rng: &mut R,
) -> Result<Vec<Segment>, LineLayoutError> {
    cfg.validate()?;
    let sx = (field.width / 2.0 - cfg.start_margin).floor() as i64;
    let sy = (field.height / 2.0 - cfg.start_margin).floor() as i64;
    if sx <= 0 || sy <= 0 {
        return Err(LineLayoutError::invalid(
            "start margins leave no interior to start lines in",
        ));
    }
    let ex = field.width / 2.0 - cfg.end_margin;
    let ey = field.height / 2.0 - cfg.end_margin;

    let mut placed: Vec<Segment> = Vec::with_capacity(count);
    'lines: for line_index in 0..count {
        for _ in 0..cfg.max_attempts_per_line {
            let start = Vector2::new(
                rng.gen_range(-sx..=sx) as f64,
                rng.gen_range(-sy..=sy) as f64,
            );
            let angle = rng.gen::<f64>() * std::f64::consts::TAU;
            let length = rng.gen_range(cfg.min_length..=cfg.max_length);
            let end = start + Vector2::new(angle.cos(), angle.sin()) * length;
            if end.x.abs() > ex || end.y.abs() > ey {
                continue;
            }
            let cand = Segment::new(start, end);
            if existing
                .iter()
                .chain(placed.iter())
                .any(|s| segments_cross(&cand, s, tol))
            {
                continue;
            }
            if dots
                .iter()
                .any(|d| point_segment_distance(*d, cand.start, cand.end) < cfg.min_dot_clearance)
            {
                continue;
            }
            placed.push(cand);
            continue 'lines;
        }
        match policy {
            LinePolicy::Strict => {
                return Err(LineLayoutError::FreeExhausted {
                    placed: placed.len(),
                    requested: count,
                    attempts: cfg.max_attempts_per_line,
                })
            }
            LinePolicy::Lenient => {
                tracing::warn!(
                    line = line_index + 1,
                    requested = count,
                    attempts = cfg.max_attempts_per_line,
                    "free line found no spot; keeping a short pattern"
                );
            }
        }
    }
    Ok(placed)
}
