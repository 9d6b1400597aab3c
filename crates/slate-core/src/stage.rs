//! Stage contract: names, statuses, static definitions and the handler trait
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::context::RunContext;

/// Every stage a run can report as current. `Failed` is a pseudo-stage: it is
/// never part of a lifecycle definition and only appears as the current stage
/// of a run whose handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStage {
    Queued,
    Scraping,
    Personas,
    Segments,
    Maps,
    Hooks,
    Briefs,
    Ssr,
    Creative,
    Qa,
    Pack,
    Done,
    Failed,
}

impl RunStage {
    pub const ALL: [RunStage; 13] = [
        RunStage::Queued,
        RunStage::Scraping,
        RunStage::Personas,
        RunStage::Segments,
        RunStage::Maps,
        RunStage::Hooks,
        RunStage::Briefs,
        RunStage::Ssr,
        RunStage::Creative,
        RunStage::Qa,
        RunStage::Pack,
        RunStage::Done,
        RunStage::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Queued => "queued",
            RunStage::Scraping => "scraping",
            RunStage::Personas => "personas",
            RunStage::Segments => "segments",
            RunStage::Maps => "maps",
            RunStage::Hooks => "hooks",
            RunStage::Briefs => "briefs",
            RunStage::Ssr => "ssr",
            RunStage::Creative => "creative",
            RunStage::Qa => "qa",
            RunStage::Pack => "pack",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage: {0}")]
pub struct ParseStageError(pub String);

impl FromStr for RunStage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunStage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| ParseStageError(s.to_string()))
    }
}

/// Per-stage status. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Active,
    Blocked,
    Completed,
    Failed,
}

impl StageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Failed)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageStatus::Pending => "pending",
            StageStatus::Active => "active",
            StageStatus::Blocked => "blocked",
            StageStatus::Completed => "completed",
            StageStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// One entry of the static, ordered lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub name: RunStage,
    /// Block for a manual resume before the handler runs (autopilot runs only)
    #[serde(default)]
    pub autopilot_pause: bool,
}

impl StageDefinition {
    pub const fn new(name: RunStage) -> Self {
        Self {
            name,
            autopilot_pause: false,
        }
    }

    pub const fn paused(name: RunStage) -> Self {
        Self {
            name,
            autopilot_pause: true,
        }
    }
}

/// The production lifecycle.
pub const DEFAULT_LIFECYCLE: [StageDefinition; 12] = [
    StageDefinition::new(RunStage::Queued),
    StageDefinition::new(RunStage::Scraping),
    StageDefinition::new(RunStage::Personas),
    StageDefinition::paused(RunStage::Segments),
    StageDefinition::new(RunStage::Maps),
    StageDefinition::new(RunStage::Hooks),
    StageDefinition::new(RunStage::Briefs),
    StageDefinition::paused(RunStage::Ssr),
    StageDefinition::new(RunStage::Creative),
    StageDefinition::paused(RunStage::Qa),
    StageDefinition::new(RunStage::Pack),
    StageDefinition::new(RunStage::Done),
];

/// Stages of [`DEFAULT_LIFECYCLE`] that wait for manual approval.
pub fn autopilot_gates() -> Vec<RunStage> {
    DEFAULT_LIFECYCLE
        .iter()
        .filter(|definition| definition.autopilot_pause)
        .map(|definition| definition.name)
        .collect()
}

/// Progress record of a single stage within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage: RunStage,
    pub status: StageStatus,
    pub entered_at: Option<DateTime<Utc>>,
    pub exited_at: Option<DateTime<Utc>>,
    /// Set whenever the status is `blocked` or `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_reason: Option<String>,
}

impl StageProgress {
    pub fn pending(stage: RunStage) -> Self {
        Self {
            stage,
            status: StageStatus::Pending,
            entered_at: None,
            exited_at: None,
            blocking_reason: None,
        }
    }
}

/// Work executed when the lifecycle enters a stage.
///
/// Handlers see the run context read-only; stage statuses belong to the
/// lifecycle engine. Anything the handler produces goes into `state`, the
/// per-run runtime owned by the caller. Returning an error fails the stage and
/// the run.
#[async_trait::async_trait]
pub trait StageHandler<S>: Send + Sync {
    async fn handle(&self, context: &RunContext, state: &mut S) -> anyhow::Result<()>;
}
