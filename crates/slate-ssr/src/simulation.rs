//! Anchor-conditioned synthesis of simulated rating distributions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anchors::{AnchorDefinition, ANCHORS, ANCHOR_COUNT};
use crate::embedding::{blend, cosine, embed_text};
use crate::pmf::{self, Pmf, PMF_CEILING, PMF_FLOOR};
use crate::records::{HookRecord, PersonaRecord};
use crate::rng::{SplitMix64, UnitRng};
use crate::seed::SimulationSeeds;

/// Weighted probability a response record must exceed to be reported
pub const REPORTING_THRESHOLD: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("SSR/UNSUPPORTED_MODE: {0}")]
    UnsupportedMode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// Deterministic, seed-driven synthesis
    Sim,
    /// Reserved for model-backed responses; never executed
    Live,
}

impl FromStr for SimulationMode {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sim" => Ok(Self::Sim),
            "live" => Ok(Self::Live),
            other => Err(SimulationError::UnsupportedMode(other.to_string())),
        }
    }
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sim => "sim",
            Self::Live => "live",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorDistribution {
    pub anchor_id: String,
    /// Rescaled cosine similarity in `[0, 1]`
    pub interaction: f64,
    /// Signed position on the response curve; `-1` is weak, `1` is strong
    pub position: f64,
    pub weight: f64,
    pub pmf: Pmf,
    pub derived_seed: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub response_id: String,
    pub persona_id: String,
    pub hook_id: String,
    pub anchor_id: String,
    pub rating: u8,
    /// Anchor weight times the anchor's probability of this rating
    pub probability: f64,
    pub derived_seed: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub persona_id: String,
    pub hook_id: String,
    pub seed: u64,
    pub pmf: Pmf,
    pub mean: f64,
    pub entropy: f64,
    pub ks_score: f64,
    pub bimodal: f64,
    pub separation: f64,
    /// P(4) + P(5) of the relevance distribution
    pub top_two_box: f64,
    /// Rating distribution read for purchase intent. Same anchors and
    /// weights as `pmf`, with each anchor moved by the persona's price
    /// sensitivity.
    pub purchase_intent: Pmf,
    pub purchase_intent_mean: f64,
    /// P(4) + P(5) of `purchase_intent`
    pub purchase_intent_high_mass: f64,
    pub anchor_distributions: Vec<AnchorDistribution>,
    pub responses: Vec<ResponseRecord>,
}

impl SimulationResult {
    pub fn entropy_coverage(&self) -> f64 {
        pmf::entropy_coverage(&self.pmf)
    }
}

/// Inputs that move one anchor's distribution, each in `[0, 1]` except `tilt`
struct Signals {
    interaction: f64,
    confidence: f64,
    persona_weight: f64,
    novelty: f64,
    min_distance: f64,
    jitter: f64,
}

/// Signed position on the response curve. Hook novelty and distance carry
/// the most weight; at the extremes of every signal the position passes
/// `±1` and the curve saturates.
fn shift(anchor: &AnchorDefinition, s: &Signals) -> f64 {
    let lens = (anchor.scale * (2.0 * s.interaction - 1.0)).clamp(-1.0, 1.0);
    0.20 * lens
        + 0.16 * (2.0 * s.confidence - 1.0)
        + 0.08 * (2.0 * s.persona_weight - 1.0)
        + 0.30 * (2.0 * s.novelty - 1.0)
        + 0.25 * (1.0 - 2.0 * s.min_distance)
        + 0.12 * anchor.tilt
        + 0.06 * (2.0 * s.jitter - 1.0)
}

fn anchor_pmf(position: f64) -> Pmf {
    let t = 0.5 + position / 2.0;
    pmf::clamp_and_renormalize(pmf::response_curve(t), PMF_FLOOR, PMF_CEILING)
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Runs simulations against a fixed anchor set
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    anchors: [AnchorDefinition; ANCHOR_COUNT],
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self {
            anchors: (*ANCHORS).clone(),
        }
    }

    pub fn anchors(&self) -> &[AnchorDefinition; ANCHOR_COUNT] {
        &self.anchors
    }

    pub fn run(
        &self,
        persona: &PersonaRecord,
        hook: &HookRecord,
        seed: u64,
        mode: SimulationMode,
    ) -> Result<SimulationResult, SimulationError> {
        if mode != SimulationMode::Sim {
            return Err(SimulationError::UnsupportedMode(mode.to_string()));
        }

        let seeds = SimulationSeeds::derive(&persona.persona_id, &hook.hook_id, seed);
        let persona_vec = embed_text(&persona.profile_text(), seeds.persona);
        let hook_vec = embed_text(&hook.hook_text, seeds.hook);
        let context = blend(&persona_vec, &hook_vec);

        let mut rng = SplitMix64::new(seeds.combined);
        let jitters: Vec<f64> = (0..ANCHOR_COUNT).map(|_| rng.next_unit()).collect();
        let raw_weights: Vec<f64> = self
            .anchors
            .iter()
            .map(|anchor| anchor.scale * (0.85 + 0.3 * rng.next_unit()))
            .collect();
        let weight_total: f64 = raw_weights.iter().sum();

        let persona_weight = persona.weight.max(0.0);
        let purchase_offset = persona.price_sensitivity.purchase_offset();
        let mut anchor_distributions = Vec::with_capacity(ANCHOR_COUNT);
        let mut purchase_pmfs = Vec::with_capacity(ANCHOR_COUNT);
        for (i, anchor) in self.anchors.iter().enumerate() {
            let interaction = (cosine(&context, &anchor.vector) + 1.0) / 2.0;
            let signals = Signals {
                interaction,
                confidence: unit(persona.confidence_level),
                persona_weight: persona_weight / (1.0 + persona_weight),
                novelty: unit(hook.novelty),
                min_distance: unit(hook.min_distance),
                jitter: jitters[i],
            };
            let position = shift(anchor, &signals);
            let weight = raw_weights[i] / weight_total;
            purchase_pmfs.push((weight, anchor_pmf(position + purchase_offset)));
            anchor_distributions.push(AnchorDistribution {
                anchor_id: anchor.id.to_string(),
                interaction,
                position,
                weight,
                pmf: anchor_pmf(position),
                derived_seed: seeds.pseudo_seed(&format!("anchor:{}", anchor.id)),
            });
        }

        let aggregate = pmf::mix(anchor_distributions.iter().map(|a| (a.weight, &a.pmf)));
        let aggregate = pmf::clamp_and_renormalize(aggregate, PMF_FLOOR, PMF_CEILING);
        let purchase_intent = pmf::mix(purchase_pmfs.iter().map(|(weight, dist)| (*weight, dist)));
        let purchase_intent = pmf::clamp_and_renormalize(purchase_intent, PMF_FLOOR, PMF_CEILING);

        let mut responses = Vec::new();
        for anchor in &anchor_distributions {
            for (index, p) in anchor.pmf.iter().enumerate() {
                let probability = anchor.weight * p;
                if probability <= REPORTING_THRESHOLD {
                    continue;
                }
                let rating = index as u8 + 1;
                let response_id = format!(
                    "{}-{}-{}-r{}",
                    persona.persona_id, hook.hook_id, anchor.anchor_id, rating
                );
                responses.push(ResponseRecord {
                    derived_seed: seeds.pseudo_seed(&format!("response:{}:{}", anchor.anchor_id, rating)),
                    response_id,
                    persona_id: persona.persona_id.clone(),
                    hook_id: hook.hook_id.clone(),
                    anchor_id: anchor.anchor_id.clone(),
                    rating,
                    probability,
                });
            }
        }

        Ok(SimulationResult {
            persona_id: persona.persona_id.clone(),
            hook_id: hook.hook_id.clone(),
            seed,
            mean: pmf::mean(&aggregate),
            entropy: pmf::entropy(&aggregate),
            ks_score: pmf::ks_score(&aggregate),
            bimodal: pmf::bimodal_share(&aggregate),
            separation: pmf::separation(&aggregate),
            top_two_box: pmf::top_two_box(&aggregate),
            purchase_intent_mean: pmf::mean(&purchase_intent),
            purchase_intent_high_mass: pmf::top_two_box(&purchase_intent),
            purchase_intent,
            pmf: aggregate,
            anchor_distributions,
            responses,
        })
    }
}

/// Simulates one persona × hook pair with the built-in anchor set
pub fn run_simulation(
    persona: &PersonaRecord,
    hook: &HookRecord,
    seed: u64,
    mode: &str,
) -> Result<SimulationResult, SimulationError> {
    let mode: SimulationMode = mode.parse()?;
    SimulationEngine::new().run(persona, hook, seed, mode)
}
