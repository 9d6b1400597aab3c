//! Numeric rule checks used outside the simulation stage
//!
//! Hook distance gates the "hooks" stage; placement coverage gates "qa".

use crate::gate::{below, GateCheck, GateEvaluation};
use crate::profile::QualityProfile;

/// A hook must be novel enough and far enough from the existing corpus.
pub fn enforce_distance(novelty: f64, min_distance: f64, profile: &QualityProfile) -> GateEvaluation {
    if below(novelty, profile.novelty_floor) {
        return GateEvaluation::fail(
            GateCheck::Novelty,
            format!("Novelty {:.2} below floor {}", novelty, profile.novelty_floor),
        );
    }

    if !(min_distance < profile.hook_distance_max) {
        return GateEvaluation::fail(GateCheck::HookDistance, "Hook too similar to existing corpus");
    }

    GateEvaluation::pass()
}

/// Placement coverage must reach the profile's target before packaging.
pub fn enforce_coverage(coverage: f64, profile: &QualityProfile) -> GateEvaluation {
    if below(coverage, profile.coverage_target) {
        return GateEvaluation::fail(
            GateCheck::Coverage,
            format!(
                "Coverage {:.2} below target {}",
                coverage, profile.coverage_target
            ),
        );
    }
    GateEvaluation::pass()
}
