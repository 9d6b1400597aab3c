//! Per-run pipeline state handed to every stage handler.

use serde::{Deserialize, Serialize};
use slate_core::RunStage;
use slate_quality::SsrMetrics;
use slate_ssr::{HookRecord, PersonaRecord, Pmf};

/// One file produced by a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    pub stage: RunStage,
    pub artifact_type: String,
    pub filename: String,
    pub content_type: String,
    pub body: String,
}

impl ArtifactEnvelope {
    pub fn json(stage: RunStage, artifact_type: &str, body: String) -> Self {
        Self::new(stage, artifact_type, "json", "application/json", body)
    }

    pub fn jsonl(stage: RunStage, artifact_type: &str, body: String) -> Self {
        Self::new(stage, artifact_type, "jsonl", "application/x-ndjson", body)
    }

    pub fn csv(stage: RunStage, artifact_type: &str, body: String) -> Self {
        Self::new(stage, artifact_type, "csv", "text/csv", body)
    }

    fn new(
        stage: RunStage,
        artifact_type: &str,
        extension: &str,
        content_type: &str,
        body: String,
    ) -> Self {
        Self {
            stage,
            artifact_type: artifact_type.to_string(),
            filename: format!("{}/{}.{}", stage, artifact_type, extension),
            content_type: content_type.to_string(),
            body,
        }
    }
}

/// Gate outcome of one persona × hook combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsrEvaluation {
    /// `persona_id:hook_id`
    pub id: String,
    pub metrics: SsrMetrics,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Everything the ssr stage decided, kept for the pack stage and the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsrAudit {
    pub evaluations: Vec<SsrEvaluation>,
    /// Persona-weight-normalized mix over all combinations
    pub aggregate_pmf: Pmf,
}

impl SsrAudit {
    pub fn passed(&self) -> bool {
        self.evaluations.iter().all(|evaluation| evaluation.ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SsrEvaluation> {
        self.evaluations.iter().filter(|evaluation| !evaluation.ok)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineRuntime {
    pub seed: u64,
    /// Applies the stricter fast-track gate tier to every combination
    pub fast_track: bool,
    pub personas: Vec<PersonaRecord>,
    pub hooks: Vec<HookRecord>,
    pub artifacts: Vec<ArtifactEnvelope>,
    pub ssr: Option<SsrAudit>,
    pub coverage: Option<f64>,
}

impl PipelineRuntime {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn push_artifact(&mut self, artifact: ArtifactEnvelope) {
        self.artifacts.push(artifact);
    }

    pub fn artifacts_for(&self, stage: RunStage) -> impl Iterator<Item = &ArtifactEnvelope> {
        self.artifacts.iter().filter(move |artifact| artifact.stage == stage)
    }

    pub fn artifact(&self, artifact_type: &str) -> Option<&ArtifactEnvelope> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.artifact_type == artifact_type)
    }
}
