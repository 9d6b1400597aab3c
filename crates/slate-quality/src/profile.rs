//! Quality profiles: the named thresholds every gate reads
//!
//! A profile is loaded once (built in or from YAML) and shared read-only by
//! every run. Its fingerprint feeds run-id derivation so two runs only share an
//! identity when they were gated by the same numbers.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Thresholds for the simulated-response gates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateThresholds {
    // === Baseline tier ===
    /// Minimum mean rating on the 1-5 scale
    pub relevance_mean_min: f64,

    /// Minimum KS-like divergence score
    pub ks_min: f64,

    /// Minimum Shannon entropy (bits)
    pub entropy_min: f64,

    /// Minimum entropy as a share of the 5-point maximum (log2 5)
    pub entropy_coverage: f64,

    /// Minimum P(1) + P(5)
    pub bimodal_share: f64,

    /// Minimum gap between the two largest probability masses
    pub separation_min: f64,

    /// Minimum purchase-intent mean, checked when reported
    pub purchase_intent_mean_min: f64,

    /// Minimum purchase-intent top-two-box mass, checked when reported
    pub purchase_intent_high_mass: f64,

    // === Fast-track tier ===
    /// Purchase-intent mean floor for fast-tracked content
    pub fast_track_mean: f64,

    /// Entropy ceiling for fast-tracked content
    pub fast_track_entropy_max: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            relevance_mean_min: 3.8,
            ks_min: 0.85,
            entropy_min: 1.2,
            entropy_coverage: 0.7,
            bimodal_share: 0.3,
            separation_min: 0.15,
            purchase_intent_mean_min: 4.1,
            purchase_intent_high_mass: 0.7,
            fast_track_mean: 4.3,
            fast_track_entropy_max: 1.2,
        }
    }
}

impl GateThresholds {
    fn named(&self) -> [(&'static str, f64); 10] {
        [
            ("relevance_mean_min", self.relevance_mean_min),
            ("ks_min", self.ks_min),
            ("entropy_min", self.entropy_min),
            ("entropy_coverage", self.entropy_coverage),
            ("bimodal_share", self.bimodal_share),
            ("separation_min", self.separation_min),
            ("purchase_intent_mean_min", self.purchase_intent_mean_min),
            ("purchase_intent_high_mass", self.purchase_intent_high_mass),
            ("fast_track_mean", self.fast_track_mean),
            ("fast_track_entropy_max", self.fast_track_entropy_max),
        ]
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("PROFILE/IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("PROFILE/YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("PROFILE/INVALID: {0}")]
    Invalid(String),
}

/// Every threshold a run is gated by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    /// Profile name (e.g., "standard@1.0")
    pub name: String,

    /// Simulated-response gates
    #[serde(default)]
    pub ssr: GateThresholds,

    // === Hook distance ===

    /// Minimum copy novelty of a hook
    pub novelty_floor: f64,

    /// Min-distance at or above this means the hook is too close to the corpus
    pub hook_distance_max: f64,

    // === Export ===

    /// Minimum placement coverage before packaging
    pub coverage_target: f64,
}

impl QualityProfile {
    pub fn standard() -> Self {
        Self {
            name: "standard@1.0".to_string(),
            ssr: GateThresholds::default(),
            novelty_floor: 0.18,
            hook_distance_max: 0.82,
            coverage_target: 0.8,
        }
    }

    /// Load profile from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, ProfileError> {
        let profile: Self = serde_yaml::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Thresholds must be finite; NaN would silently pass every comparison.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let scalars = [
            ("novelty_floor", self.novelty_floor),
            ("hook_distance_max", self.hook_distance_max),
            ("coverage_target", self.coverage_target),
        ];
        for (name, value) in self.ssr.named().into_iter().chain(scalars) {
            if !value.is_finite() {
                return Err(ProfileError::Invalid(format!("{} is not finite", name)));
            }
        }
        Ok(())
    }

    /// Stable hash of the profile contents, `blake3:<hex>`
    pub fn fingerprint(&self) -> String {
        // field order is fixed by the struct, so the JSON encoding is canonical
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        format!("blake3:{}", blake3::hash(&bytes))
    }
}

impl Default for QualityProfile {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_thresholds() {
        let profile = QualityProfile::standard();
        assert_eq!(profile.ssr.ks_min, 0.85);
        assert_eq!(profile.ssr.purchase_intent_mean_min, 4.1);
        assert_eq!(profile.coverage_target, 0.8);
    }

    #[test]
    fn test_from_yaml_with_default_ssr_block() {
        let profile = QualityProfile::from_yaml(
            "name: lenient@1.0\nnovelty_floor: 0.1\nhook_distance_max: 0.9\ncoverage_target: 0.5\n",
        )
        .unwrap();
        assert_eq!(profile.name, "lenient@1.0");
        assert_eq!(profile.ssr, GateThresholds::default());
        assert_eq!(profile.coverage_target, 0.5);
    }

    #[test]
    fn test_from_yaml_rejects_non_finite() {
        let result = QualityProfile::from_yaml(
            "name: broken\nnovelty_floor: .nan\nhook_distance_max: 0.9\ncoverage_target: 0.5\n",
        );
        assert!(matches!(result, Err(ProfileError::Invalid(_))));
    }

    #[test]
    fn test_fingerprint_tracks_contents() {
        let standard = QualityProfile::standard();
        let mut tightened = QualityProfile::standard();
        tightened.ssr.ks_min = 0.9;

        assert_eq!(standard.fingerprint(), QualityProfile::standard().fingerprint());
        assert_ne!(standard.fingerprint(), tightened.fingerprint());
        assert!(standard.fingerprint().starts_with("blake3:"));
    }
}
