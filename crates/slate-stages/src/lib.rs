//! Slate Stages: handlers that connect content, simulation and gates to the
//! run lifecycle.
//!
//! Every gated handler computes first, writes its artifacts, then fails the
//! stage on any violation. The lifecycle engine turns that failure into a
//! terminal run.
//!
//! # Pipeline Flow
//!
//! ```text
//! personas → hooks ─(distance gate)→ ssr ─(SSR gates)→ qa ─(coverage)→ pack
//!   ↓          ↓                      ↓                  ↓               ↓
//! personas   hooks.jsonl       ssr_* / failure       qa_report    export_manifest
//! ```
//!
//! Stages without a handler here (scraping, segments, maps, briefs, creative)
//! complete as soon as they are entered.

mod error;
mod hooks;
mod pack;
mod personas;
mod qa;
mod runtime;
mod source;
mod ssr;

pub use error::{GateViolation, PackError, SourceError};
pub use hooks::HooksStage;
pub use pack::PackStage;
pub use personas::PersonasStage;
pub use qa::QaStage;
pub use runtime::{ArtifactEnvelope, PipelineRuntime, SsrAudit, SsrEvaluation};
pub use source::{ContentSource, FixtureSource, StaticSource};
pub use ssr::{combination_seed, metrics_of, SsrStage};

use std::sync::Arc;

use slate_core::{LifecycleError, RunStage, StageLifecycle};
use slate_quality::{GateEvaluator, QualityProfile};

/// Registers the personas, hooks, ssr, qa and pack handlers
pub fn register_pipeline(
    lifecycle: &mut StageLifecycle<PipelineRuntime>,
    profile: &QualityProfile,
    source: Arc<dyn ContentSource>,
) -> Result<(), LifecycleError> {
    lifecycle.register_handler(RunStage::Personas, PersonasStage::new(source.clone()))?;
    lifecycle.register_handler(
        RunStage::Hooks,
        HooksStage::new(source.clone(), profile.clone()),
    )?;
    lifecycle.register_handler(RunStage::Ssr, SsrStage::new(GateEvaluator::new(profile.ssr)))?;
    lifecycle.register_handler(RunStage::Qa, QaStage::new(source, profile.clone()))?;
    lifecycle.register_handler(RunStage::Pack, PackStage::new(profile))?;
    Ok(())
}
