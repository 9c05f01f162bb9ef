//! Structural re-validation of exported stimulus sets.
//!
//! `check` exists so a stimulus file can be vetted right before a session:
//! every pattern invariant is re-checked with the same predicates that
//! generated it, plus the cross-pattern properties (shared family layouts,
//! mirrored half-blocks) that no single pattern can witness.

use serde::Serialize;

use crate::export::ExperimentDto;

/// Result of a full re-validation pass.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub patterns: usize,
    pub trials: usize,
    pub violations: Vec<String>,
}

pub fn check_experiment(doc: &ExperimentDto) -> CheckReport {
    let cfg = doc.params.pattern_cfg();
    let mut violations = Vec::new();
    let mut patterns = 0;

    for (kind, pool) in [("reference", &doc.references), ("test", &doc.tests)] {
        for (i, dto) in pool.iter().enumerate() {
            patterns += 1;
            if let Err(violation) = dto.to_pattern().verify(&cfg) {
                violations.push(format!("{kind} pattern {i}: {violation}"));
            }
        }
    }
    for (i, practice) in doc.practice.iter().enumerate() {
        patterns += 1;
        if let Err(violation) = practice.test.to_pattern().verify(&cfg) {
            violations.push(format!("practice pattern {i}: {violation}"));
        }
    }

    // Family members must share their layout coordinate-for-coordinate.
    let levels = doc.params.design.connectedness_levels.len();
    if levels > 0 {
        for (family, chunk) in doc.tests.chunks(levels).enumerate() {
            if chunk
                .iter()
                .any(|m| m.dots != chunk[0].dots || m.pattern_id != chunk[0].pattern_id)
            {
                violations.push(format!("family {family}: members do not share a dot layout"));
            }
        }
    }

    // Counterbalancing: each slot once per half-block, sides flipped.
    let slots = doc.references.len();
    let mut trials = 0;
    for (b, block) in doc.blocks.iter().enumerate() {
        trials += block.len();
        if block.len() != slots * 2 {
            violations.push(format!(
                "block {b}: expected {} trials, found {}",
                slots * 2,
                block.len()
            ));
            continue;
        }
        let (first, second) = block.split_at(slots);
        for (a, z) in first.iter().zip(second) {
            if a.slot != z.slot || a.test_on_left == z.test_on_left {
                violations.push(format!(
                    "block {b}: halves are not mirrored at slot {}",
                    a.slot
                ));
                break;
            }
        }
    }

    CheckReport {
        patterns,
        trials,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExperimentDto;
    use numerosity::design::{build_experiment, DesignCfg};
    use numerosity::pattern::PatternCfg;

    fn small_doc() -> ExperimentDto {
        let cfg = PatternCfg::default();
        let design = DesignCfg {
            test_dot_numbers: vec![11, 13],
            patterns_per_condition: 1,
            num_blocks: 2,
            practice_trials: 2,
            ..DesignCfg::default()
        };
        let experiment = build_experiment(&cfg, &design, 11).unwrap();
        ExperimentDto::from_experiment(&experiment, 11, None, &cfg, &design)
    }

    #[test]
    fn freshly_generated_sets_pass() {
        let doc = small_doc();
        let report = check_experiment(&doc);
        assert!(report.violations.is_empty(), "{:?}", report.violations);
        assert_eq!(report.patterns, 6 + 6 + 2);
        assert_eq!(report.trials, 2 * 2 * 6);
    }

    #[test]
    fn tampered_dot_is_reported() {
        let mut doc = small_doc();
        doc.tests[0].dots[0] = doc.tests[0].dots[1];
        let report = check_experiment(&doc);
        assert!(report
            .violations
            .iter()
            .any(|v| v.starts_with("test pattern 0:")));
        // The shared-layout check fires as well.
        assert!(report.violations.iter().any(|v| v.starts_with("family 0:")));
    }

    #[test]
    fn broken_mirroring_is_reported() {
        let mut doc = small_doc();
        let last = doc.blocks[0].len() - 1;
        doc.blocks[0][last].test_on_left = !doc.blocks[0][last].test_on_left;
        let report = check_experiment(&doc);
        assert!(report
            .violations
            .iter()
            .any(|v| v.contains("halves are not mirrored")));
    }
}
