use slate_core::RunStage;
use thiserror::Error;

/// A stage refused to complete because one or more gates failed
#[derive(Debug, Clone, PartialEq, Error)]
#[error("GATE/{stage}: {}", .violations.join("; "))]
pub struct GateViolation {
    pub stage: RunStage,
    pub violations: Vec<String>,
}

impl GateViolation {
    pub fn new(stage: RunStage, violations: Vec<String>) -> Self {
        Self { stage, violations }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    #[error("PACK/MISSING_AUDIT: no SSR audit recorded for this run")]
    MissingAudit,

    #[error("PACK/FAILED_AUDIT: {0} SSR evaluation(s) failed")]
    FailedAudit(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("SOURCE/EMPTY: {0}")]
    Empty(&'static str),
}
