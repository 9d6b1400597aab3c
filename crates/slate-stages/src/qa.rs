use std::sync::Arc;

use serde_json::json;
use slate_core::{async_trait, RunContext, RunStage, StageHandler};
use slate_quality::{enforce_coverage, QualityProfile};

use crate::error::GateViolation;
use crate::runtime::{ArtifactEnvelope, PipelineRuntime};
use crate::source::ContentSource;

/// Placement coverage must reach the profile target
pub struct QaStage {
    source: Arc<dyn ContentSource>,
    profile: QualityProfile,
}

impl QaStage {
    pub fn new(source: Arc<dyn ContentSource>, profile: QualityProfile) -> Self {
        Self { source, profile }
    }
}

#[async_trait]
impl StageHandler<PipelineRuntime> for QaStage {
    async fn handle(&self, context: &RunContext, runtime: &mut PipelineRuntime) -> anyhow::Result<()> {
        let coverage = self.source.placement_coverage(context)?;
        let gate = enforce_coverage(coverage, &self.profile);
        runtime.coverage = Some(coverage);

        let report = json!({
            "coverage": coverage,
            "coverage_target": self.profile.coverage_target,
            "ok": gate.ok,
            "reason": gate.reason,
        });
        runtime.push_artifact(ArtifactEnvelope::json(
            RunStage::Qa,
            "qa_report",
            serde_json::to_string_pretty(&report)?,
        ));

        match gate.reason {
            Some(reason) => Err(GateViolation::new(RunStage::Qa, vec![reason]).into()),
            None => Ok(()),
        }
    }
}
