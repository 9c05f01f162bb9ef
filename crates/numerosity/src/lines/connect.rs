//! Connecting lines: segments whose endpoints are exactly two dot centers.

use nalgebra::Vector2;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::geom::{point_segment_distance, segments_cross, GeomTol, Segment};

use super::{LineCfg, LineLayoutError};

/// Outcome of a connecting-line pass: the segments plus the dot-index pairs
/// they join, in matching order. May hold fewer connections than requested;
/// the caller decides whether under-delivery is acceptable.
#[derive(Clone, Debug, Default)]
pub struct Connections {
    pub segments: Vec<Segment>,
    pub pairs: Vec<(usize, usize)>,
}

/// Connect up to `count` dot pairs.
///
/// A shuffled pool holds the indices still available for connection. Each
/// round fixes the front index and scans the rest of the pool for a partner
/// whose distance lies in `[min_length, max_length]` and whose segment
/// neither crosses an existing line nor passes within `min_dot_clearance` of
/// a dot outside the pair. On success both indices leave the pool for good
/// (a connected dot is never reused); on a fruitless scan the front index
/// rotates to the back. The scan order is deterministic given the pool, so a
/// full rotation without an acceptance proves no pair fits and the pass
/// stops early instead of burning the rest of the `connect_attempts` budget.
pub fn place_connecting_lines<R: Rng>(
    count: usize,
    dots: &[Vector2<f64>],
    existing: &[Segment],
    cfg: &LineCfg,
    tol: GeomTol,
    rng: &mut R,
) -> Result<Connections, LineLayoutError> {
    cfg.validate()?;
    let mut pool: Vec<usize> = (0..dots.len()).collect();
    pool.shuffle(rng);

    let mut out = Connections::default();
    'connections: for _ in 0..count {
        if pool.len() < 2 {
            break;
        }
        let mut fruitless = 0usize;
        while fruitless < pool.len() && (fruitless as u32) < cfg.connect_attempts {
            let idx1 = pool[0];
            let p1 = dots[idx1];
            let mut accepted: Option<(usize, Segment)> = None;
            for (slot, &idx2) in pool.iter().enumerate().skip(1) {
                let p2 = dots[idx2];
                let dist = (p2 - p1).norm();
                if dist < cfg.min_length || dist > cfg.max_length {
                    continue;
                }
                let cand = Segment::new(p1, p2);
                if existing
                    .iter()
                    .chain(out.segments.iter())
                    .any(|s| segments_cross(&cand, s, tol))
                {
                    continue;
                }
                if clears_other_dots(&cand, dots, idx1, idx2, cfg) {
                    accepted = Some((slot, cand));
                    break;
                }
            }
            if let Some((slot, cand)) = accepted {
                // slot > 0, so removing it first leaves the front at 0.
                let idx2 = pool[slot];
                out.segments.push(cand);
                out.pairs.push((idx1, idx2));
                pool.remove(slot);
                pool.remove(0);
                continue 'connections;
            }
            pool.rotate_left(1);
            fruitless += 1;
        }
        // No partner for any front index; further connections are hopeless.
        break;
    }
    Ok(out)
}

fn clears_other_dots(
    seg: &Segment,
    dots: &[Vector2<f64>],
    a: usize,
    b: usize,
    cfg: &LineCfg,
) -> bool {
    dots.iter().enumerate().all(|(i, d)| {
        i == a || i == b || point_segment_distance(*d, seg.start, seg.end) >= cfg.min_dot_clearance
    })
}
