//! Serde DTOs for the exported stimulus JSON.
//!
//! Schema: dots as `[x, y]` pairs, lines as `{start, end}` records,
//! connected pairs as dot-index pairs. The generation params ride along so a
//! consumer (or `check`) can re-derive the exact configuration a file was
//! produced under.

use serde::{Deserialize, Serialize};

use numerosity::design::{DesignCfg, Experiment, PracticeTrial, TrialSlot};
use numerosity::geom::{GeomTol, Segment};
use numerosity::lines::LineCfg;
use numerosity::pattern::{DotPattern, PatternCfg, RenderCfg};
use numerosity::prelude::Vec2;
use numerosity::sampler::FieldCfg;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LineDto {
    pub start: [f64; 2],
    pub end: [f64; 2],
}

impl LineDto {
    fn from_segment(seg: &Segment) -> Self {
        Self {
            start: [seg.start.x, seg.start.y],
            end: [seg.end.x, seg.end.y],
        }
    }

    fn to_segment(&self) -> Segment {
        Segment::new(
            Vec2::new(self.start[0], self.start[1]),
            Vec2::new(self.end[0], self.end[1]),
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PatternDto {
    pub num_dots: usize,
    pub connectedness: usize,
    pub pattern_id: u64,
    pub dots: Vec<[f64; 2]>,
    pub lines: Vec<LineDto>,
    pub connected_pairs: Vec<(usize, usize)>,
}

impl PatternDto {
    pub fn from_pattern(p: &DotPattern) -> Self {
        Self {
            num_dots: p.num_dots,
            connectedness: p.connectedness,
            pattern_id: p.pattern_id,
            dots: p.dots.iter().map(|d| [d.x, d.y]).collect(),
            lines: p.lines.iter().map(LineDto::from_segment).collect(),
            connected_pairs: p.connected_pairs.clone(),
        }
    }

    pub fn to_pattern(&self) -> DotPattern {
        DotPattern {
            num_dots: self.num_dots,
            connectedness: self.connectedness,
            pattern_id: self.pattern_id,
            dots: self.dots.iter().map(|d| Vec2::new(d[0], d[1])).collect(),
            lines: self.lines.iter().map(LineDto::to_segment).collect(),
            connected_pairs: self.connected_pairs.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrialDto {
    pub block: usize,
    pub half: u8,
    pub slot: usize,
    pub test_on_left: bool,
}

impl TrialDto {
    fn from_slot(t: &TrialSlot) -> Self {
        Self {
            block: t.block,
            half: t.half,
            slot: t.slot,
            test_on_left: t.test_on_left,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PracticeDto {
    pub test: PatternDto,
    pub reference_slot: usize,
    pub test_on_left: bool,
}

impl PracticeDto {
    fn from_trial(t: &PracticeTrial) -> Self {
        Self {
            test: PatternDto::from_pattern(&t.test),
            reference_slot: t.reference_slot,
            test_on_left: t.test_on_left,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FieldDto {
    pub width: f64,
    pub height: f64,
    pub min_dot_distance: f64,
    pub boundary_margin: f64,
    pub max_attempts_per_dot: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LinesDto {
    pub min_length: f64,
    pub max_length: f64,
    pub min_dot_clearance: f64,
    pub start_margin: f64,
    pub end_margin: f64,
    pub max_attempts_per_line: u32,
    pub connect_attempts: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TolDto {
    pub eps_parallel: f64,
    pub t_min: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RenderDto {
    pub dot_diameter: f64,
    pub line_width: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DesignDto {
    pub reference_dots: usize,
    pub test_dot_numbers: Vec<usize>,
    pub connectedness_levels: Vec<usize>,
    pub patterns_per_condition: usize,
    pub num_blocks: usize,
    pub practice_trials: usize,
    pub practice_test_dots: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ParamsDto {
    pub field: FieldDto,
    pub lines: LinesDto,
    pub tol: TolDto,
    pub render: RenderDto,
    pub total_lines: usize,
    pub max_family_attempts: u32,
    pub design: DesignDto,
}

impl ParamsDto {
    pub fn from_cfgs(cfg: &PatternCfg, design: &DesignCfg) -> Self {
        Self {
            field: FieldDto {
                width: cfg.field.width,
                height: cfg.field.height,
                min_dot_distance: cfg.field.min_dot_distance,
                boundary_margin: cfg.field.boundary_margin,
                max_attempts_per_dot: cfg.field.max_attempts_per_dot,
            },
            lines: LinesDto {
                min_length: cfg.lines.min_length,
                max_length: cfg.lines.max_length,
                min_dot_clearance: cfg.lines.min_dot_clearance,
                start_margin: cfg.lines.start_margin,
                end_margin: cfg.lines.end_margin,
                max_attempts_per_line: cfg.lines.max_attempts_per_line,
                connect_attempts: cfg.lines.connect_attempts,
            },
            tol: TolDto {
                eps_parallel: cfg.tol.eps_parallel,
                t_min: cfg.tol.t_min,
            },
            render: RenderDto {
                dot_diameter: cfg.render.dot_diameter,
                line_width: cfg.render.line_width,
            },
            total_lines: cfg.total_lines,
            max_family_attempts: cfg.max_family_attempts,
            design: DesignDto {
                reference_dots: design.reference_dots,
                test_dot_numbers: design.test_dot_numbers.clone(),
                connectedness_levels: design.connectedness_levels.clone(),
                patterns_per_condition: design.patterns_per_condition,
                num_blocks: design.num_blocks,
                practice_trials: design.practice_trials,
                practice_test_dots: design.practice_test_dots,
            },
        }
    }

    pub fn pattern_cfg(&self) -> PatternCfg {
        PatternCfg {
            field: FieldCfg {
                width: self.field.width,
                height: self.field.height,
                min_dot_distance: self.field.min_dot_distance,
                boundary_margin: self.field.boundary_margin,
                max_attempts_per_dot: self.field.max_attempts_per_dot,
            },
            lines: LineCfg {
                min_length: self.lines.min_length,
                max_length: self.lines.max_length,
                min_dot_clearance: self.lines.min_dot_clearance,
                start_margin: self.lines.start_margin,
                end_margin: self.lines.end_margin,
                max_attempts_per_line: self.lines.max_attempts_per_line,
                connect_attempts: self.lines.connect_attempts,
            },
            tol: GeomTol {
                eps_parallel: self.tol.eps_parallel,
                t_min: self.tol.t_min,
            },
            render: RenderCfg {
                dot_diameter: self.render.dot_diameter,
                line_width: self.render.line_width,
            },
            total_lines: self.total_lines,
            max_family_attempts: self.max_family_attempts,
        }
    }

    pub fn design_cfg(&self) -> DesignCfg {
        DesignCfg {
            reference_dots: self.design.reference_dots,
            test_dot_numbers: self.design.test_dot_numbers.clone(),
            connectedness_levels: self.design.connectedness_levels.clone(),
            patterns_per_condition: self.design.patterns_per_condition,
            num_blocks: self.design.num_blocks,
            practice_trials: self.design.practice_trials,
            practice_test_dots: self.design.practice_test_dots,
        }
    }
}

/// Top-level export document.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExperimentDto {
    pub seed: u64,
    pub participant: Option<u32>,
    pub generator_version: String,
    pub params: ParamsDto,
    pub references: Vec<PatternDto>,
    pub tests: Vec<PatternDto>,
    pub practice: Vec<PracticeDto>,
    pub blocks: Vec<Vec<TrialDto>>,
}

impl ExperimentDto {
    pub fn from_experiment(
        experiment: &Experiment,
        seed: u64,
        participant: Option<u32>,
        cfg: &PatternCfg,
        design: &DesignCfg,
    ) -> Self {
        Self {
            seed,
            participant,
            generator_version: numerosity::VERSION.to_string(),
            params: ParamsDto::from_cfgs(cfg, design),
            references: experiment
                .stimuli
                .references
                .iter()
                .map(PatternDto::from_pattern)
                .collect(),
            tests: experiment
                .stimuli
                .tests
                .iter()
                .map(PatternDto::from_pattern)
                .collect(),
            practice: experiment
                .practice
                .iter()
                .map(PracticeDto::from_trial)
                .collect(),
            blocks: experiment
                .blocks
                .iter()
                .map(|block| block.iter().map(TrialDto::from_slot).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numerosity::design::build_experiment;
    use std::fs;
    use tempfile::tempdir;

    fn small_cfgs() -> (PatternCfg, DesignCfg) {
        let cfg = PatternCfg::default();
        let design = DesignCfg {
            test_dot_numbers: vec![11, 13],
            patterns_per_condition: 1,
            num_blocks: 1,
            practice_trials: 2,
            ..DesignCfg::default()
        };
        (cfg, design)
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let (cfg, design) = small_cfgs();
        let experiment = build_experiment(&cfg, &design, 42).unwrap();
        let doc = ExperimentDto::from_experiment(&experiment, 42, Some(1), &cfg, &design);

        let dir = tempdir().unwrap();
        let path = dir.path().join("stimuli.json");
        fs::write(&path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
        let parsed: ExperimentDto = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(parsed, doc);

        // Reconstructed patterns still satisfy every invariant.
        let cfg2 = parsed.params.pattern_cfg();
        for dto in parsed.references.iter().chain(parsed.tests.iter()) {
            dto.to_pattern().verify(&cfg2).unwrap();
        }
    }

    #[test]
    fn same_seed_serializes_identically() {
        let (cfg, design) = small_cfgs();
        let a = build_experiment(&cfg, &design, 9).unwrap();
        let b = build_experiment(&cfg, &design, 9).unwrap();
        let ja = serde_json::to_string(&ExperimentDto::from_experiment(&a, 9, None, &cfg, &design))
            .unwrap();
        let jb = serde_json::to_string(&ExperimentDto::from_experiment(&b, 9, None, &cfg, &design))
            .unwrap();
        assert_eq!(ja, jb);
    }

    #[test]
    fn cfg_round_trips_through_params() {
        let (cfg, design) = small_cfgs();
        let params = ParamsDto::from_cfgs(&cfg, &design);
        let cfg2 = params.pattern_cfg();
        assert_eq!(cfg2.field.width, cfg.field.width);
        assert_eq!(cfg2.lines.max_length, cfg.lines.max_length);
        assert_eq!(cfg2.total_lines, cfg.total_lines);
        let design2 = params.design_cfg();
        assert_eq!(design2.test_dot_numbers, design.test_dot_numbers);
        assert_eq!(design2.practice_trials, design.practice_trials);
    }
}
