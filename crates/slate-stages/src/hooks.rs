use std::sync::Arc;

use slate_core::{async_trait, RunContext, RunStage, StageHandler};
use slate_quality::{enforce_distance, QualityProfile};
use tracing::debug;

use crate::error::{GateViolation, SourceError};
use crate::runtime::{ArtifactEnvelope, PipelineRuntime};
use crate::source::ContentSource;

/// Loads hooks and rejects any that are stale or too close to the corpus
pub struct HooksStage {
    source: Arc<dyn ContentSource>,
    profile: QualityProfile,
}

impl HooksStage {
    pub fn new(source: Arc<dyn ContentSource>, profile: QualityProfile) -> Self {
        Self { source, profile }
    }
}

#[async_trait]
impl StageHandler<PipelineRuntime> for HooksStage {
    async fn handle(&self, context: &RunContext, runtime: &mut PipelineRuntime) -> anyhow::Result<()> {
        let hooks = self.source.hooks(context, &runtime.personas)?;
        if hooks.is_empty() {
            return Err(SourceError::Empty("hooks").into());
        }

        let violations: Vec<String> = hooks
            .iter()
            .filter_map(|hook| {
                let gate = enforce_distance(hook.novelty, hook.min_distance, &self.profile);
                gate.reason.map(|reason| format!("{} {}", hook.hook_id, reason))
            })
            .collect();
        if !violations.is_empty() {
            return Err(GateViolation::new(RunStage::Hooks, violations).into());
        }
        debug!(run_id = %context.run_id, count = hooks.len(), "Hooks loaded");

        let mut body = String::new();
        for hook in &hooks {
            body.push_str(&serde_json::to_string(hook)?);
            body.push('\n');
        }
        runtime.push_artifact(ArtifactEnvelope::jsonl(RunStage::Hooks, "hooks", body));
        runtime.hooks = hooks;
        Ok(())
    }
}
