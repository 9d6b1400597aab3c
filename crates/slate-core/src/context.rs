//! Run context: identity of a run plus the progress of every stage
use chrono::{DateTime, Utc};

use crate::snapshot::RunStateSnapshot;
use crate::stage::{RunStage, StageProgress, StageStatus};

/// Parameters accepted by `StageLifecycle::initialize_context`.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub run_id: String,
    pub tenant_id: String,
    pub source_url: String,
    pub anchor_set_version: String,
    pub model_revision: String,
    pub locale: String,
    pub currency: String,
    pub autopilot_enabled: bool,
}

impl RunParams {
    pub fn new(
        run_id: impl Into<String>,
        tenant_id: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            tenant_id: tenant_id.into(),
            source_url: source_url.into(),
            anchor_set_version: "andronoma-sim-v1".to_string(),
            model_revision: "2024-10-01".to_string(),
            locale: "en-US".to_string(),
            currency: "USD".to_string(),
            autopilot_enabled: true,
        }
    }

    pub fn anchor_set_version(mut self, version: impl Into<String>) -> Self {
        self.anchor_set_version = version.into();
        self
    }

    pub fn model_revision(mut self, revision: impl Into<String>) -> Self {
        self.model_revision = revision.into();
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn autopilot(mut self, enabled: bool) -> Self {
        self.autopilot_enabled = enabled;
        self
    }
}

/// State of one run.
///
/// Stage progress is stored in lifecycle order, one entry per stage
/// definition, and is only mutated by the lifecycle engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub run_id: String,
    pub tenant_id: String,
    pub source_url: String,
    pub anchor_set_version: String,
    pub model_revision: String,
    pub locale: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) current_stage: RunStage,
    pub autopilot_enabled: bool,
    pub(crate) stages: Vec<StageProgress>,
}

impl RunContext {
    pub fn current_stage(&self) -> RunStage {
        self.current_stage
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Stage progress in lifecycle order
    pub fn stages(&self) -> &[StageProgress] {
        &self.stages
    }

    pub fn progress(&self, stage: RunStage) -> Option<&StageProgress> {
        self.stages.iter().find(|progress| progress.stage == stage)
    }

    pub fn status_of(&self, stage: RunStage) -> Option<StageStatus> {
        self.progress(stage).map(|progress| progress.status)
    }

    /// Stage currently waiting for a manual resume, if any
    pub fn blocked_stage(&self) -> Option<RunStage> {
        self.stages
            .iter()
            .find(|progress| progress.status == StageStatus::Blocked)
            .map(|progress| progress.stage)
    }

    pub fn active_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|progress| progress.status == StageStatus::Active)
            .count()
    }

    pub fn is_failed(&self) -> bool {
        self.current_stage == RunStage::Failed
    }

    /// True once the run failed or its last stage completed.
    pub fn is_terminal(&self) -> bool {
        self.is_failed()
            || self
                .stages
                .last()
                .map(|progress| progress.status == StageStatus::Completed)
                .unwrap_or(false)
    }

    pub fn snapshot(&self) -> RunStateSnapshot {
        RunStateSnapshot {
            run_id: self.run_id.clone(),
            tenant_id: self.tenant_id.clone(),
            anchor_set_version: self.anchor_set_version.clone(),
            model_revision: self.model_revision.clone(),
            url: self.source_url.clone(),
            locale: self.locale.clone(),
            currency: self.currency.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            current_stage: self.current_stage,
            autopilot_enabled: self.autopilot_enabled,
            stages: self.stages.clone(),
        }
    }
}
