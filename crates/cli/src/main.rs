use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use polars::prelude::*;
use std::fs;
use std::path::Path;
use tracing_subscriber::fmt::SubscriberBuilder;

use numerosity::design::{build_experiment, DesignCfg, Experiment};
use numerosity::lines::LineCfg;
use numerosity::pattern::PatternCfg;
use numerosity::sampler::FieldCfg;

mod checker;
mod export;
mod provenance;

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Stimulus-set generator for the connectedness numerosity experiment")]
struct Cmd {
    /// Master seed for pattern generation and trial ordering
    #[arg(long, default_value_t = 2025)]
    seed: u64,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Generate the stimulus set and trial order, written as JSON
    Generate {
        #[arg(long)]
        out: String,
        /// Participant id recorded in the export
        #[arg(long)]
        participant: Option<u32>,
        #[command(flatten)]
        scale: ScaleArgs,
    },
    /// Export the flat trial design matrix as CSV
    Design {
        #[arg(long)]
        out: String,
        #[command(flatten)]
        scale: ScaleArgs,
    },
    /// Re-validate an exported stimulus JSON against the structural invariants
    Check {
        #[arg(long)]
        input: String,
    },
}

#[derive(Args)]
struct ScaleArgs {
    /// Families per dot-count condition (full design: 8)
    #[arg(long)]
    patterns_per_condition: Option<usize>,
    /// Number of main blocks (full design: 5)
    #[arg(long)]
    blocks: Option<usize>,
    /// Reduced field geometry for quick runs (240x320, spacing 38, margin 10)
    #[arg(long, default_value_t = false)]
    test_mode: bool,
}

impl ScaleArgs {
    fn cfgs(&self) -> (PatternCfg, DesignCfg) {
        let mut cfg = PatternCfg::default();
        if self.test_mode {
            cfg.field = FieldCfg {
                width: 240.0,
                height: 320.0,
                min_dot_distance: 38.0,
                boundary_margin: 10.0,
                ..cfg.field
            };
            cfg.lines = LineCfg {
                start_margin: 10.0,
                end_margin: 0.0,
                ..cfg.lines
            };
        }
        let mut design = DesignCfg::default();
        if let Some(ppc) = self.patterns_per_condition {
            design.patterns_per_condition = ppc;
        }
        if let Some(blocks) = self.blocks {
            design.num_blocks = blocks;
        }
        (cfg, design)
    }
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Generate {
            out,
            participant,
            scale,
        } => generate(cmd.seed, out, participant, scale),
        Action::Design { out, scale } => design_matrix(cmd.seed, out, scale),
        Action::Check { input } => check(input),
    }
}

fn run_generation(seed: u64, scale: &ScaleArgs) -> Result<(Experiment, PatternCfg, DesignCfg)> {
    let (cfg, design) = scale.cfgs();
    tracing::info!(
        seed,
        trials_per_half_block = design.trials_per_half_block(),
        blocks = design.num_blocks,
        "generating stimulus set"
    );
    let experiment = build_experiment(&cfg, &design, seed)
        .context("stimulus generation failed; check pattern size vs dot count vs spacing")?;
    Ok((experiment, cfg, design))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    Ok(())
}

fn generate(seed: u64, out: String, participant: Option<u32>, scale: ScaleArgs) -> Result<()> {
    let (experiment, cfg, design) = run_generation(seed, &scale)?;
    let doc = export::ExperimentDto::from_experiment(&experiment, seed, participant, &cfg, &design);

    let out_path = Path::new(&out);
    ensure_parent(out_path)?;
    fs::write(out_path, serde_json::to_vec_pretty(&doc)?)
        .with_context(|| format!("writing {out}"))?;
    provenance::write_sidecar(
        out_path,
        provenance::Payload {
            seed,
            params: serde_json::to_value(&doc.params)?,
        },
    )?;
    tracing::info!(
        references = doc.references.len(),
        tests = doc.tests.len(),
        practice = doc.practice.len(),
        out,
        "stimulus set written"
    );
    Ok(())
}

fn design_matrix(seed: u64, out: String, scale: ScaleArgs) -> Result<()> {
    let (experiment, _cfg, _design) = run_generation(seed, &scale)?;

    let trial_count: usize = experiment.blocks.iter().map(Vec::len).sum();
    let mut blocks: Vec<u32> = Vec::with_capacity(trial_count);
    let mut halves: Vec<u32> = Vec::with_capacity(trial_count);
    let mut trials: Vec<u32> = Vec::with_capacity(trial_count);
    let mut slots: Vec<u32> = Vec::with_capacity(trial_count);
    let mut test_on_left: Vec<bool> = Vec::with_capacity(trial_count);
    let mut test_dots: Vec<u32> = Vec::with_capacity(trial_count);
    let mut test_connectedness: Vec<u32> = Vec::with_capacity(trial_count);
    let mut test_pattern_id: Vec<u64> = Vec::with_capacity(trial_count);
    let mut ref_dots: Vec<u32> = Vec::with_capacity(trial_count);

    for block in &experiment.blocks {
        for (i, trial) in block.iter().enumerate() {
            let test = &experiment.stimuli.tests[trial.slot];
            let reference = &experiment.stimuli.references[trial.slot];
            blocks.push(trial.block as u32);
            halves.push(trial.half as u32);
            trials.push(i as u32 + 1);
            slots.push(trial.slot as u32);
            test_on_left.push(trial.test_on_left);
            test_dots.push(test.num_dots as u32);
            test_connectedness.push(test.connectedness as u32);
            test_pattern_id.push(test.pattern_id);
            ref_dots.push(reference.num_dots as u32);
        }
    }

    let mut df = df!(
        "block" => blocks,
        "half" => halves,
        "trial" => trials,
        "slot" => slots,
        "test_on_left" => test_on_left,
        "test_dots" => test_dots,
        "test_connectedness" => test_connectedness,
        "test_pattern_id" => test_pattern_id,
        "ref_dots" => ref_dots,
    )?;

    let out_path = Path::new(&out);
    ensure_parent(out_path)?;
    let mut file = fs::File::create(out_path).with_context(|| format!("creating {out}"))?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    provenance::write_sidecar(
        out_path,
        provenance::Payload {
            seed,
            params: serde_json::json!({
                "rows": df.height(),
                "test_mode": scale.test_mode,
            }),
        },
    )?;
    tracing::info!(rows = df.height(), out, "design matrix written");
    Ok(())
}

fn check(input: String) -> Result<()> {
    let raw = fs::read(&input).with_context(|| format!("reading {input}"))?;
    let doc: export::ExperimentDto =
        serde_json::from_slice(&raw).with_context(|| format!("parsing {input}"))?;
    let report = checker::check_experiment(&doc);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.violations.is_empty() {
        bail!("{} invariant violations in {input}", report.violations.len());
    }
    tracing::info!(
        patterns = report.patterns,
        trials = report.trials,
        "all invariants hold"
    );
    Ok(())
}
