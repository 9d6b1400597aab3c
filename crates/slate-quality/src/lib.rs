//! Slate Quality: gate thresholds and gate evaluation
//!
//! Gates are pure threshold comparisons. A run's stage handlers compute the
//! metrics, ask the gates, and fail the stage on the first violation.
//!
//! # Example
//!
//! ```
//! use slate_quality::{GateEvaluator, GateThresholds, SsrMetrics};
//!
//! let gate = GateEvaluator::new(GateThresholds::default());
//!
//! let metrics = SsrMetrics {
//!     relevance_mean: 4.2,
//!     ks: 0.91,
//!     entropy: 1.72,
//!     entropy_coverage_ratio: 0.74,
//!     bimodal_share: 0.56,
//!     separation: 0.28,
//!     purchase_intent_mean: Some(4.2),
//!     purchase_intent_high_mass: Some(0.79),
//!     fast_track: false,
//! };
//!
//! let verdict = gate.evaluate(&metrics);
//! assert!(verdict.ok, "{:?}", verdict.reason);
//! ```

pub mod checks;
pub mod gate;
pub mod profile;

pub use checks::{enforce_coverage, enforce_distance};
pub use gate::{evaluate, GateCheck, GateEvaluation, GateEvaluator, SsrMetrics};
pub use profile::{GateThresholds, ProfileError, QualityProfile};

/// Check whether metrics clear every gate of a profile
pub fn would_pass(metrics: &SsrMetrics, profile: &QualityProfile) -> bool {
    evaluate(metrics, &profile.ssr).ok
}
