use std::sync::Arc;

use slate_core::{async_trait, RunContext, RunStage, StageHandler};
use tracing::debug;

use crate::error::SourceError;
use crate::runtime::{ArtifactEnvelope, PipelineRuntime};
use crate::source::ContentSource;

/// Loads personas into the runtime
pub struct PersonasStage {
    source: Arc<dyn ContentSource>,
}

impl PersonasStage {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl StageHandler<PipelineRuntime> for PersonasStage {
    async fn handle(&self, context: &RunContext, runtime: &mut PipelineRuntime) -> anyhow::Result<()> {
        let personas = self.source.personas(context)?;
        if personas.is_empty() {
            return Err(SourceError::Empty("personas").into());
        }
        debug!(run_id = %context.run_id, count = personas.len(), "Personas loaded");

        let body = serde_json::to_string_pretty(&personas)?;
        runtime.push_artifact(ArtifactEnvelope::json(RunStage::Personas, "personas", body));
        runtime.personas = personas;
        Ok(())
    }
}
