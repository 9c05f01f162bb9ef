//! Constrained-random stimulus generation for a numerosity-judgment
//! experiment: dot layouts joined by a fixed budget of line segments, with
//! the same layout reused across connectedness levels so that only the
//! connectedness manipulation varies between variants.
//!
//! Layering (leaves first)
//! - `geom`: stateless segment predicates.
//! - `sampler`: dot placement under spacing/boundary constraints.
//! - `lines`: free and dot-connecting line layout.
//! - `pattern`: patterns, families, all-or-nothing family retry.
//! - `design`: condition matrix, counterbalanced block orders, practice.
//!
//! Rendering, response collection, and trial logging are downstream
//! collaborators; this crate only produces geometry and trial bookkeeping.

pub mod design;
pub mod geom;
pub mod lines;
pub mod pattern;
pub mod sampler;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::design::{
        block_trials, build_experiment, build_stimulus_set, practice_trials, DesignCfg,
        DesignError, Experiment, PracticeTrial, StimulusSet, TrialSlot,
    };
    pub use crate::geom::{point_segment_distance, segments_cross, GeomTol, Segment};
    pub use crate::lines::{
        place_connecting_lines, place_free_lines, Connections, LineCfg, LinePolicy,
    };
    pub use crate::pattern::{
        build_family, build_pattern, build_reference, DotPattern, FamilyError, FamilyReplay,
        PatternCfg, PatternError, PatternFamily, RenderCfg,
    };
    pub use crate::sampler::{sample_dots, FieldCfg, PlacementError};
    pub use nalgebra::Vector2 as Vec2;
}
