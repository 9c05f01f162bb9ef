//! Trial design: condition matrix, counterbalanced block orders, practice.
//!
//! Model
//! - One family per (test dot-count, repetition) covers every connectedness
//!   level; its members fan out interleaved into the test pool, and one
//!   zero-connectedness reference pattern is generated per trial slot. Pools
//!   line up 1:1: trial slot `i` always shows `references[i]` against
//!   `tests[i]`.
//! - A block traverses the shuffled slot order twice. The first half assigns
//!   a random test side per trial; the second half repeats the same order
//!   with every side flipped, so each condition appears exactly once per
//!   hemifield per block.
//! - Pattern randomness comes from per-pattern replay tokens; shuffling and
//!   side assignment draw from their own stream seeded directly with the
//!   master seed. The two never interleave, so adding blocks does not
//!   perturb the generated patterns.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::pattern::{
    build_family, build_reference, DotPattern, FamilyError, FamilyReplay, PatternCfg,
};

/// Experimental design parameters.
#[derive(Clone, Debug)]
pub struct DesignCfg {
    /// Dot count of every reference pattern.
    pub reference_dots: usize,
    /// Test dot-count levels.
    pub test_dot_numbers: Vec<usize>,
    /// Connectedness levels each test layout is rendered at.
    pub connectedness_levels: Vec<usize>,
    /// Families per test dot-count.
    pub patterns_per_condition: usize,
    /// Main blocks per session.
    pub num_blocks: usize,
    /// Practice trial count (easy discrimination, no families).
    pub practice_trials: usize,
    /// Test dot count used in practice.
    pub practice_test_dots: usize,
}

impl Default for DesignCfg {
    fn default() -> Self {
        Self {
            reference_dots: 12,
            test_dot_numbers: (9..=15).collect(),
            connectedness_levels: vec![0, 1, 2],
            patterns_per_condition: 8,
            num_blocks: 5,
            practice_trials: 30,
            practice_test_dots: 9,
        }
    }
}

impl DesignCfg {
    pub fn validate(&self) -> Result<(), DesignError> {
        if self.reference_dots == 0 || self.practice_test_dots == 0 {
            return Err(DesignError::invalid("dot counts must be > 0"));
        }
        if self.test_dot_numbers.is_empty() {
            return Err(DesignError::invalid("test_dot_numbers must be non-empty"));
        }
        if self.connectedness_levels.is_empty() {
            return Err(DesignError::invalid(
                "connectedness_levels must be non-empty",
            ));
        }
        let mut levels = self.connectedness_levels.clone();
        levels.sort_unstable();
        levels.dedup();
        if levels.len() != self.connectedness_levels.len() {
            return Err(DesignError::invalid(
                "connectedness_levels must not repeat; duplicates would unbalance the design",
            ));
        }
        if self.patterns_per_condition == 0 {
            return Err(DesignError::invalid("patterns_per_condition must be > 0"));
        }
        if self.num_blocks == 0 {
            return Err(DesignError::invalid("num_blocks must be > 0"));
        }
        Ok(())
    }

    /// Conditions x repetitions: the size of each stimulus pool and the
    /// number of trials in one half-block.
    pub fn trials_per_half_block(&self) -> usize {
        self.test_dot_numbers.len() * self.connectedness_levels.len() * self.patterns_per_condition
    }

    /// Families built for the test pool.
    fn family_count(&self) -> usize {
        self.test_dot_numbers.len() * self.patterns_per_condition
    }
}

/// Error type for trial design assembly.
#[derive(Debug)]
pub enum DesignError {
    InvalidParams { reason: String },
    Reference { slot: usize, source: FamilyError },
    Family { num_dots: usize, repetition: usize, source: FamilyError },
    Practice { trial: usize, source: FamilyError },
}

impl DesignError {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DesignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParams { reason } => write!(f, "invalid design params: {reason}"),
            Self::Reference { slot, source } => {
                write!(f, "reference pattern for slot {slot} failed: {source}")
            }
            Self::Family {
                num_dots,
                repetition,
                source,
            } => write!(
                f,
                "family for {num_dots} test dots (repetition {repetition}) failed: {source}"
            ),
            Self::Practice { trial, source } => {
                write!(f, "practice pattern {trial} failed: {source}")
            }
        }
    }
}

impl std::error::Error for DesignError {}

/// All patterns for one session: a reference per trial slot plus the
/// interleaved test pool (family members fanned out level-by-level, so
/// `tests[i]` has connectedness `levels[i % levels.len()]`).
#[derive(Clone, Debug)]
pub struct StimulusSet {
    pub references: Vec<DotPattern>,
    pub tests: Vec<DotPattern>,
}

/// One presentation: which pooled pattern pair to show, and on which side
/// the test pattern appears.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrialSlot {
    pub block: usize,
    /// 1 or 2; the second half mirrors the first with sides flipped.
    pub half: u8,
    /// Index into both stimulus pools.
    pub slot: usize,
    pub test_on_left: bool,
}

/// Practice presentation: an easy standalone test pattern against a pooled
/// reference.
#[derive(Clone, Debug, PartialEq)]
pub struct PracticeTrial {
    pub test: DotPattern,
    pub reference_slot: usize,
    pub test_on_left: bool,
}

/// A complete generated session.
#[derive(Clone, Debug)]
pub struct Experiment {
    pub stimuli: StimulusSet,
    pub practice: Vec<PracticeTrial>,
    pub blocks: Vec<Vec<TrialSlot>>,
}

// Replay-index layout per master seed: [0, slots) reference patterns,
// [slots, slots + families) family layouts, then practice patterns.

/// Generate every reference and test pattern for the design.
///
/// Aborts on the first failing condition with a diagnostic naming it; a
/// partially generated set is never returned, since an unbalanced pool
/// would corrupt the trial design.
pub fn build_stimulus_set(
    cfg: &PatternCfg,
    design: &DesignCfg,
    seed: u64,
) -> Result<StimulusSet, DesignError> {
    design.validate()?;
    cfg.validate()
        .map_err(|err| DesignError::invalid(err.to_string()))?;

    let slots = design.trials_per_half_block();
    let mut references = Vec::with_capacity(slots);
    for slot in 0..slots {
        let replay = FamilyReplay {
            seed,
            index: slot as u64,
        };
        let pattern = build_reference(cfg, design.reference_dots, slot as u64, replay)
            .map_err(|source| DesignError::Reference { slot, source })?;
        references.push(pattern);
    }
    tracing::info!(count = references.len(), "reference patterns generated");

    let mut tests = Vec::with_capacity(slots);
    let mut family_ordinal = 0u64;
    for &num_dots in &design.test_dot_numbers {
        for repetition in 0..design.patterns_per_condition {
            let replay = FamilyReplay {
                seed,
                index: slots as u64 + family_ordinal,
            };
            let family = build_family(
                cfg,
                num_dots,
                &design.connectedness_levels,
                family_ordinal,
                replay,
            )
            .map_err(|source| DesignError::Family {
                num_dots,
                repetition,
                source,
            })?;
            tests.extend(family.members);
            family_ordinal += 1;
        }
    }
    tracing::info!(count = tests.len(), "test patterns generated");

    Ok(StimulusSet { references, tests })
}

/// Trial order for one block: both halves traverse the same shuffled slot
/// order; the second half flips every test side.
pub fn block_trials<R: Rng>(slots: usize, block: usize, rng: &mut R) -> Vec<TrialSlot> {
    let mut order: Vec<usize> = (0..slots).collect();
    order.shuffle(rng);
    let sides: Vec<bool> = (0..slots).map(|_| rng.gen()).collect();

    let mut trials = Vec::with_capacity(slots * 2);
    for (slot, side) in order.iter().zip(&sides) {
        trials.push(TrialSlot {
            block,
            half: 1,
            slot: *slot,
            test_on_left: *side,
        });
    }
    for (slot, side) in order.iter().zip(&sides) {
        trials.push(TrialSlot {
            block,
            half: 2,
            slot: *slot,
            test_on_left: !side,
        });
    }
    trials
}

/// Practice trials: easy discrimination with standalone patterns, references
/// drawn cyclically from the reference pool.
pub fn practice_trials<R: Rng>(
    cfg: &PatternCfg,
    design: &DesignCfg,
    seed: u64,
    rng: &mut R,
) -> Result<Vec<PracticeTrial>, DesignError> {
    design.validate()?;
    let slots = design.trials_per_half_block();
    let replay_base = (slots + design.family_count()) as u64;

    let mut trials = Vec::with_capacity(design.practice_trials);
    for trial in 0..design.practice_trials {
        let replay = FamilyReplay {
            seed,
            index: replay_base + trial as u64,
        };
        let test = build_reference(cfg, design.practice_test_dots, trial as u64, replay)
            .map_err(|source| DesignError::Practice { trial, source })?;
        trials.push(PracticeTrial {
            test,
            reference_slot: trial % slots,
            test_on_left: rng.gen(),
        });
    }
    Ok(trials)
}

/// Build the whole session: stimulus pools, practice, per-block orders.
pub fn build_experiment(
    cfg: &PatternCfg,
    design: &DesignCfg,
    seed: u64,
) -> Result<Experiment, DesignError> {
    let stimuli = build_stimulus_set(cfg, design, seed)?;
    let slots = design.trials_per_half_block();

    let mut order_rng = StdRng::seed_from_u64(seed);
    let practice = practice_trials(cfg, design, seed, &mut order_rng)?;
    let blocks = (1..=design.num_blocks)
        .map(|block| block_trials(slots, block, &mut order_rng))
        .collect();

    Ok(Experiment {
        stimuli,
        practice,
        blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_design() -> DesignCfg {
        DesignCfg {
            test_dot_numbers: vec![11, 13],
            patterns_per_condition: 1,
            num_blocks: 2,
            practice_trials: 5,
            ..DesignCfg::default()
        }
    }

    #[test]
    fn default_design_matches_the_published_counts() {
        let design = DesignCfg::default();
        // 7 dot numbers x 3 levels x 8 repetitions.
        assert_eq!(design.trials_per_half_block(), 168);
    }

    #[test]
    fn pools_line_up_and_fan_out_interleaved() {
        let cfg = PatternCfg::default();
        let design = small_design();
        let set = build_stimulus_set(&cfg, &design, 42).unwrap();

        let slots = design.trials_per_half_block();
        assert_eq!(slots, 6);
        assert_eq!(set.references.len(), slots);
        assert_eq!(set.tests.len(), slots);

        for reference in &set.references {
            assert_eq!(reference.num_dots, design.reference_dots);
            assert_eq!(reference.connectedness, 0);
            reference.verify(&cfg).unwrap();
        }
        let levels = &design.connectedness_levels;
        for (i, test) in set.tests.iter().enumerate() {
            assert_eq!(test.connectedness, levels[i % levels.len()]);
            test.verify(&cfg).unwrap();
        }
        // Members of one family share dots and identity.
        for chunk in set.tests.chunks(levels.len()) {
            for member in chunk {
                assert_eq!(member.dots, chunk[0].dots);
                assert_eq!(member.pattern_id, chunk[0].pattern_id);
            }
        }
    }

    #[test]
    fn blocks_mirror_the_slot_order_and_flip_sides() {
        let slots = 12;
        let mut rng = StdRng::seed_from_u64(3);
        let trials = block_trials(slots, 1, &mut rng);
        assert_eq!(trials.len(), slots * 2);

        let (first, second) = trials.split_at(slots);
        for (a, b) in first.iter().zip(second) {
            assert_eq!(a.half, 1);
            assert_eq!(b.half, 2);
            assert_eq!(a.slot, b.slot);
            assert_eq!(a.test_on_left, !b.test_on_left);
        }
        // Every slot appears exactly once per half.
        let mut seen: Vec<usize> = first.iter().map(|t| t.slot).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..slots).collect::<Vec<_>>());
    }

    #[test]
    fn practice_uses_the_easy_configuration() {
        let cfg = PatternCfg::default();
        let design = small_design();
        let mut rng = StdRng::seed_from_u64(1);
        let practice = practice_trials(&cfg, &design, 42, &mut rng).unwrap();
        assert_eq!(practice.len(), 5);
        let slots = design.trials_per_half_block();
        for trial in &practice {
            assert_eq!(trial.test.num_dots, design.practice_test_dots);
            assert_eq!(trial.test.connectedness, 0);
            assert!(trial.reference_slot < slots);
        }
    }

    #[test]
    fn same_seed_reproduces_the_whole_session() {
        let cfg = PatternCfg::default();
        let design = small_design();
        let a = build_experiment(&cfg, &design, 7).unwrap();
        let b = build_experiment(&cfg, &design, 7).unwrap();
        assert_eq!(a.blocks, b.blocks);
        assert_eq!(a.practice, b.practice);
        assert_eq!(a.stimuli.references, b.stimuli.references);
        assert_eq!(a.stimuli.tests, b.stimuli.tests);
    }

    #[test]
    fn duplicate_levels_are_rejected() {
        let design = DesignCfg {
            connectedness_levels: vec![0, 1, 1],
            ..DesignCfg::default()
        };
        assert!(matches!(
            design.validate(),
            Err(DesignError::InvalidParams { .. })
        ));
    }
}
