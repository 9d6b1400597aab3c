//! Upstream records the simulation reads: audience personas and creative hooks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSensitivity {
    Low,
    Medium,
    High,
}

impl PriceSensitivity {
    /// Nudge applied to an anchor's position when reading purchase intent
    /// instead of relevance
    pub fn purchase_offset(self) -> f64 {
        match self {
            Self::Low => 0.04,
            Self::Medium => 0.0,
            Self::High => -0.04,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaRecord {
    pub persona_id: String,
    pub name: String,
    /// Job to be done
    pub jtbd: String,
    pub context: String,
    pub trigger: String,
    pub blocker: String,
    pub price_sensitivity: PriceSensitivity,
    /// In `[0, 1]`
    pub confidence_level: f64,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
    /// Relative audience share; non-negative
    pub weight: f64,
}

impl PersonaRecord {
    /// Text projected into the persona embedding
    pub fn profile_text(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.name, self.jtbd, self.context, self.trigger, self.blocker
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mobile,
    Desktop,
    Story,
    Square,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookRecord {
    pub hook_id: String,
    pub segment_id: String,
    pub device: Device,
    pub hook_text: String,
    pub proof_ref: String,
    /// Copy novelty in `[0, 1]`
    pub novelty: f64,
    /// Distance to the nearest existing hook in `[0, 1]`
    pub min_distance: f64,
    #[serde(default)]
    pub legal_risk: f64,
}
