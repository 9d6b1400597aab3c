//! Serializable projection of a run for API and CLI consumers
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::{RunStage, StageProgress, StageStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStateSnapshot {
    pub run_id: String,
    pub tenant_id: String,
    pub anchor_set_version: String,
    pub model_revision: String,
    pub url: String,
    pub locale: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_stage: RunStage,
    pub autopilot_enabled: bool,
    pub stages: Vec<StageProgress>,
}

impl RunStateSnapshot {
    pub fn status_of(&self, stage: RunStage) -> Option<StageStatus> {
        self.stages
            .iter()
            .find(|progress| progress.stage == stage)
            .map(|progress| progress.status)
    }
}
