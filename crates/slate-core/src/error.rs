//! Lifecycle error model
use thiserror::Error;

use crate::stage::{RunStage, StageStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("STAGE/NOT_FOUND: stage {0} not found in lifecycle")]
    StageNotFound(RunStage),

    #[error("STAGE/INVALID_RESUME: stage {stage} is not blocked (status: {status})")]
    InvalidResumeState { stage: RunStage, status: StageStatus },

    #[error("STAGE/ALREADY_STARTED: run {0} was already started")]
    AlreadyStarted(String),

    #[error("STAGE/HANDLER: stage {stage} failed: {reason}")]
    HandlerFailure { stage: RunStage, reason: String },

    #[error("LIFECYCLE/INVALID: {0}")]
    InvalidLifecycle(String),
}

impl LifecycleError {
    /// Failure reason recorded on the stage, when the error came from a handler
    pub fn handler_reason(&self) -> Option<&str> {
        match self {
            LifecycleError::HandlerFailure { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
