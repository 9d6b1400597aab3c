//! The ssr stage: simulate every persona × hook combination and gate it.

use serde_json::json;
use slate_core::{async_trait, RunContext, RunStage, StageHandler};
use slate_quality::{GateEvaluator, SsrMetrics};
use slate_ssr::seed::hash_u64;
use slate_ssr::{
    pmf, Pmf, SimulationEngine, SimulationMode, SimulationResult, ANCHOR_COUNT, EMBEDDING_MODEL,
};
use std::fmt::Write as _;
use tracing::{debug, warn};

use crate::error::{GateViolation, SourceError};
use crate::runtime::{ArtifactEnvelope, PipelineRuntime, SsrAudit, SsrEvaluation};

/// Seed of one combination, derived from the run seed
pub fn combination_seed(run_seed: u64, persona_id: &str, hook_id: &str) -> u64 {
    hash_u64(&[&run_seed.to_le_bytes(), persona_id.as_bytes(), hook_id.as_bytes()])
}

/// Gate metrics of a simulation. Relevance checks read the rating
/// distribution; purchase-intent checks read the price-adjusted one.
pub fn metrics_of(result: &SimulationResult, fast_track: bool) -> SsrMetrics {
    SsrMetrics {
        relevance_mean: result.mean,
        ks: result.ks_score,
        entropy: result.entropy,
        entropy_coverage_ratio: result.entropy_coverage(),
        bimodal_share: result.bimodal,
        separation: result.separation,
        purchase_intent_mean: Some(result.purchase_intent_mean),
        purchase_intent_high_mass: Some(result.purchase_intent_high_mass),
        fast_track,
    }
}

pub struct SsrStage {
    engine: SimulationEngine,
    evaluator: GateEvaluator,
}

impl SsrStage {
    pub fn new(evaluator: GateEvaluator) -> Self {
        Self {
            engine: SimulationEngine::new(),
            evaluator,
        }
    }

    fn write_artifacts(
        &self,
        context: &RunContext,
        runtime: &mut PipelineRuntime,
        results: &[SimulationResult],
        audit: &SsrAudit,
    ) -> anyhow::Result<()> {
        let config = json!({
            "anchor_sets_version": context.anchor_set_version,
            "model_revision": context.model_revision,
            "embedding_model": EMBEDDING_MODEL,
            "sets": ANCHOR_COUNT,
            "seed": runtime.seed,
        });

        let mut responses = String::new();
        let mut ks_entropy = String::from("persona_id,hook_id,ks,entropy\n");
        let mut separation = String::from("persona_id,hook_id,separation,bimodal\n");
        for result in results {
            for response in &result.responses {
                responses.push_str(&serde_json::to_string(response)?);
                responses.push('\n');
            }
            writeln!(
                ks_entropy,
                "{},{},{:.4},{:.4}",
                result.persona_id, result.hook_id, result.ks_score, result.entropy
            )?;
            writeln!(
                separation,
                "{},{},{:.4},{:.4}",
                result.persona_id, result.hook_id, result.separation, result.bimodal
            )?;
        }

        let stage = RunStage::Ssr;
        runtime.push_artifact(ArtifactEnvelope::json(stage, "ssr_config", serde_json::to_string_pretty(&config)?));
        runtime.push_artifact(ArtifactEnvelope::jsonl(stage, "ssr_responses", responses));
        runtime.push_artifact(ArtifactEnvelope::csv(stage, "ks_entropy", ks_entropy));
        runtime.push_artifact(ArtifactEnvelope::json(
            stage,
            "ssr_pmf",
            serde_json::to_string(&json!({ "pmf": audit.aggregate_pmf }))?,
        ));
        runtime.push_artifact(ArtifactEnvelope::csv(stage, "separation", separation));
        runtime.push_artifact(ArtifactEnvelope::json(
            stage,
            "ssr_gates",
            serde_json::to_string_pretty(&audit.evaluations)?,
        ));
        Ok(())
    }
}

#[async_trait]
impl StageHandler<PipelineRuntime> for SsrStage {
    async fn handle(&self, context: &RunContext, runtime: &mut PipelineRuntime) -> anyhow::Result<()> {
        if runtime.personas.is_empty() {
            return Err(SourceError::Empty("personas").into());
        }
        if runtime.hooks.is_empty() {
            return Err(SourceError::Empty("hooks").into());
        }

        let mut results = Vec::with_capacity(runtime.personas.len() * runtime.hooks.len());
        let mut evaluations = Vec::with_capacity(results.capacity());
        let mut weighted: Vec<(f64, Pmf)> = Vec::with_capacity(results.capacity());

        for persona in &runtime.personas {
            for hook in &runtime.hooks {
                let seed = combination_seed(runtime.seed, &persona.persona_id, &hook.hook_id);
                let result = self.engine.run(persona, hook, seed, SimulationMode::Sim)?;
                let metrics = metrics_of(&result, runtime.fast_track);
                let verdict = self.evaluator.evaluate(&metrics);

                let id = format!("{}:{}", persona.persona_id, hook.hook_id);
                debug!(run_id = %context.run_id, combination = %id, ok = verdict.ok, "SSR evaluated");
                evaluations.push(SsrEvaluation {
                    id,
                    metrics,
                    ok: verdict.ok,
                    reason: verdict.reason,
                });
                weighted.push((persona.weight.max(0.0), result.pmf));
                results.push(result);
            }
        }

        let total: f64 = weighted.iter().map(|(weight, _)| weight).sum();
        let aggregate_pmf = if total > 0.0 {
            pmf::mix(weighted.iter().map(|(weight, dist)| (weight / total, dist)))
        } else {
            let even = 1.0 / weighted.len() as f64;
            pmf::mix(weighted.iter().map(|(_, dist)| (even, dist)))
        };

        let audit = SsrAudit {
            evaluations,
            aggregate_pmf,
        };
        self.write_artifacts(context, runtime, &results, &audit)?;

        let violations: Vec<String> = audit
            .failures()
            .map(|failure| {
                format!(
                    "{} {}",
                    failure.id,
                    failure.reason.as_deref().unwrap_or("gate failed")
                )
            })
            .collect();
        runtime.ssr = Some(audit);

        if violations.is_empty() {
            return Ok(());
        }

        warn!(run_id = %context.run_id, failures = violations.len(), "SSR gates failed");
        let failure = json!({
            "stage": RunStage::Ssr,
            "violations": violations,
        });
        runtime.push_artifact(ArtifactEnvelope::json(
            RunStage::Ssr,
            "failure",
            serde_json::to_string_pretty(&failure)?,
        ));
        Err(GateViolation::new(RunStage::Ssr, violations).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_ssr::{run_simulation, Device, HookRecord, PersonaRecord, PriceSensitivity};

    fn simulate(price_sensitivity: PriceSensitivity) -> SimulationResult {
        let persona = PersonaRecord {
            persona_id: "p".to_string(),
            name: "Clinic manager".to_string(),
            jtbd: "fill cancelled slots".to_string(),
            context: "three dental clinics".to_string(),
            trigger: "no-show spike".to_string(),
            blocker: "phone-only booking".to_string(),
            price_sensitivity,
            confidence_level: 0.7,
            evidence_refs: vec![],
            weight: 1.0,
        };
        let hook = HookRecord {
            hook_id: "h".to_string(),
            segment_id: "s".to_string(),
            device: Device::Desktop,
            hook_text: "Refill 9 of 10 cancelled slots by text".to_string(),
            proof_ref: "case-7".to_string(),
            novelty: 0.4,
            min_distance: 0.4,
            legal_risk: 0.0,
        };
        run_simulation(&persona, &hook, 31, "sim").unwrap()
    }

    #[test]
    fn test_purchase_intent_metrics_follow_price_sensitivity() {
        let result = simulate(PriceSensitivity::High);
        let metrics = metrics_of(&result, false);
        assert_eq!(metrics.relevance_mean, result.mean);
        assert_eq!(metrics.purchase_intent_mean, Some(result.purchase_intent_mean));
        assert_eq!(metrics.purchase_intent_high_mass, Some(result.purchase_intent_high_mass));
        assert!(result.purchase_intent_mean < result.mean);

        let relaxed = metrics_of(&simulate(PriceSensitivity::Low), false);
        assert!(relaxed.purchase_intent_mean > metrics.purchase_intent_mean);
        assert_eq!(relaxed.relevance_mean, metrics.relevance_mean);
    }

    #[test]
    fn test_combination_seed_depends_on_all_parts() {
        let base = combination_seed(4242, "p", "h");
        assert_eq!(base, combination_seed(4242, "p", "h"));
        assert_ne!(base, combination_seed(4243, "p", "h"));
        assert_ne!(base, combination_seed(4242, "p", "g"));
        assert_ne!(combination_seed(1, "ab", "c"), combination_seed(1, "a", "bc"));
    }
}
