//! Where personas, hooks and placement coverage come from.
//!
//! Scraping and template generation live outside this workspace; stage
//! handlers only see them through [`ContentSource`].

use slate_core::RunContext;
use slate_ssr::{Device, HookRecord, PersonaRecord, PriceSensitivity};

pub trait ContentSource: Send + Sync {
    fn personas(&self, context: &RunContext) -> anyhow::Result<Vec<PersonaRecord>>;

    fn hooks(
        &self,
        context: &RunContext,
        personas: &[PersonaRecord],
    ) -> anyhow::Result<Vec<HookRecord>>;

    /// Share of required placements the creative set fills, in `[0, 1]`
    fn placement_coverage(&self, context: &RunContext) -> anyhow::Result<f64>;
}

/// Deterministic stand-in content keyed by the run id
#[derive(Debug, Clone)]
pub struct FixtureSource {
    pub coverage: f64,
}

impl Default for FixtureSource {
    fn default() -> Self {
        Self { coverage: 0.81 }
    }
}

impl ContentSource for FixtureSource {
    fn personas(&self, context: &RunContext) -> anyhow::Result<Vec<PersonaRecord>> {
        let run = &context.run_id;
        Ok(vec![
            PersonaRecord {
                persona_id: format!("{}-persona-1", run),
                name: "Stock-conscious shop owner".to_string(),
                jtbd: "never run out of best sellers".to_string(),
                context: format!("independent retailer selling in {}", context.currency),
                trigger: "stockout during a promotion".to_string(),
                blocker: "manual reorder spreadsheets".to_string(),
                price_sensitivity: PriceSensitivity::Low,
                confidence_level: 0.72,
                evidence_refs: vec![context.source_url.clone()],
                weight: 1.4,
            },
            PersonaRecord {
                persona_id: format!("{}-persona-2", run),
                name: "Operations lead".to_string(),
                jtbd: "keep refill costs predictable".to_string(),
                context: "multi-location team".to_string(),
                trigger: "quarterly budget review".to_string(),
                blocker: "supplier lead times".to_string(),
                price_sensitivity: PriceSensitivity::Medium,
                confidence_level: 0.64,
                evidence_refs: vec![context.source_url.clone()],
                weight: 1.0,
            },
        ])
    }

    fn hooks(
        &self,
        context: &RunContext,
        _personas: &[PersonaRecord],
    ) -> anyhow::Result<Vec<HookRecord>> {
        let run = &context.run_id;
        Ok(vec![
            HookRecord {
                hook_id: format!("{}-hook-1", run),
                segment_id: format!("{}-segment-1", run),
                device: Device::Mobile,
                hook_text: "Cut 32% off refill costs in 2 clicks".to_string(),
                proof_ref: "pricing#bundle".to_string(),
                novelty: 0.36,
                min_distance: 0.43,
                legal_risk: 0.0,
            },
            HookRecord {
                hook_id: format!("{}-hook-2", run),
                segment_id: format!("{}-segment-1", run),
                device: Device::Story,
                hook_text: "Refills ship in 2 days with tracked updates".to_string(),
                proof_ref: "shipping#policy".to_string(),
                novelty: 0.38,
                min_distance: 0.42,
                legal_risk: 0.0,
            },
        ])
    }

    fn placement_coverage(&self, _context: &RunContext) -> anyhow::Result<f64> {
        Ok(self.coverage)
    }
}

/// Fixed records, for callers that already hold their content
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub personas: Vec<PersonaRecord>,
    pub hooks: Vec<HookRecord>,
    pub coverage: f64,
}

impl ContentSource for StaticSource {
    fn personas(&self, _context: &RunContext) -> anyhow::Result<Vec<PersonaRecord>> {
        Ok(self.personas.clone())
    }

    fn hooks(
        &self,
        _context: &RunContext,
        _personas: &[PersonaRecord],
    ) -> anyhow::Result<Vec<HookRecord>> {
        Ok(self.hooks.clone())
    }

    fn placement_coverage(&self, _context: &RunContext) -> anyhow::Result<f64> {
        Ok(self.coverage)
    }
}
