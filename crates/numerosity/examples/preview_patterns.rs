//! Print a handful of generated patterns for quick sanity on counts.
//!
//! Usage:
//!   cargo run -p numerosity --example preview_patterns -- family
//!   cargo run -p numerosity --example preview_patterns -- reference

use numerosity::pattern::{build_family, build_reference, FamilyReplay, PatternCfg};

fn main() {
    let mode = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "family".to_string());
    match mode.as_str() {
        "family" => show_families(),
        "reference" => show_references(),
        _ => {
            eprintln!("usage: preview_patterns [family|reference]");
        }
    }
}

fn show_families() {
    let cfg = PatternCfg::default();
    for index in 0..3u64 {
        match build_family(&cfg, 13, &[0, 1, 2], index, FamilyReplay { seed: 2025, index }) {
            Ok(family) => {
                for member in &family.members {
                    println!(
                        "family {index}: connectedness={} dots={} lines={} pairs={:?}",
                        member.connectedness,
                        member.dots.len(),
                        member.lines.len(),
                        member.connected_pairs
                    );
                }
            }
            Err(err) => eprintln!("family {index} failed: {err}"),
        }
    }
}

fn show_references() {
    let cfg = PatternCfg::default();
    for index in 0..5u64 {
        match build_reference(&cfg, 12, index, FamilyReplay { seed: 2025, index }) {
            Ok(p) => println!(
                "reference {index}: dots={} lines={} first_dot=({:.0}, {:.0})",
                p.dots.len(),
                p.lines.len(),
                p.dots[0].x,
                p.dots[0].y
            ),
            Err(err) => eprintln!("reference {index} failed: {err}"),
        }
    }
}
