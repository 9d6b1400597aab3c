use serde_json::json;
use slate_core::{async_trait, RunContext, RunStage, StageHandler};
use slate_quality::QualityProfile;
use tracing::info;

use crate::error::PackError;
use crate::runtime::{ArtifactEnvelope, PipelineRuntime};

/// Refuses to package a run whose SSR audit is missing or failed
pub struct PackStage {
    profile_name: String,
    profile_fingerprint: String,
}

impl PackStage {
    pub fn new(profile: &QualityProfile) -> Self {
        Self {
            profile_name: profile.name.clone(),
            profile_fingerprint: profile.fingerprint(),
        }
    }
}

#[async_trait]
impl StageHandler<PipelineRuntime> for PackStage {
    async fn handle(&self, context: &RunContext, runtime: &mut PipelineRuntime) -> anyhow::Result<()> {
        let audit = runtime.ssr.as_ref().ok_or(PackError::MissingAudit)?;
        let failed = audit.failures().count();
        if failed > 0 {
            return Err(PackError::FailedAudit(failed).into());
        }

        let files: Vec<&str> = runtime
            .artifacts
            .iter()
            .map(|artifact| artifact.filename.as_str())
            .collect();
        let manifest = json!({
            "run_id": context.run_id,
            "tenant_id": context.tenant_id,
            "source_url": context.source_url,
            "anchor_set_version": context.anchor_set_version,
            "model_revision": context.model_revision,
            "locale": context.locale,
            "currency": context.currency,
            "seed": runtime.seed,
            "profile": {
                "name": self.profile_name,
                "fingerprint": self.profile_fingerprint,
            },
            "evaluations": audit.evaluations.len(),
            "coverage": runtime.coverage,
            "files": files,
        });
        let body = serde_json::to_string_pretty(&manifest)?;

        info!(run_id = %context.run_id, files = files.len(), "Export manifest written");
        runtime.push_artifact(ArtifactEnvelope::json(RunStage::Pack, "export_manifest", body));
        Ok(())
    }
}
