//! Lifecycle events and the per-engine listener seam
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::context::RunContext;
use crate::stage::{RunStage, StageProgress};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    #[serde(rename = "stage:started")]
    Started { progress: StageProgress },
    #[serde(rename = "stage:completed")]
    Completed { progress: StageProgress },
    #[serde(rename = "stage:blocked")]
    Blocked { progress: StageProgress },
    #[serde(rename = "stage:failed")]
    Failed { progress: StageProgress, error: String },
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Started { .. } => "stage:started",
            LifecycleEvent::Completed { .. } => "stage:completed",
            LifecycleEvent::Blocked { .. } => "stage:blocked",
            LifecycleEvent::Failed { .. } => "stage:failed",
        }
    }

    pub fn progress(&self) -> &StageProgress {
        match self {
            LifecycleEvent::Started { progress }
            | LifecycleEvent::Completed { progress }
            | LifecycleEvent::Blocked { progress }
            | LifecycleEvent::Failed { progress, .. } => progress,
        }
    }

    pub fn stage(&self) -> RunStage {
        self.progress().stage
    }
}

/// Receives every event emitted by the engine it is subscribed to.
/// Listeners run synchronously on the caller's task.
pub trait LifecycleListener: Send + Sync {
    fn on_event(&self, context: &RunContext, event: &LifecycleEvent);
}

impl<F> LifecycleListener for F
where
    F: Fn(&RunContext, &LifecycleEvent) + Send + Sync,
{
    fn on_event(&self, context: &RunContext, event: &LifecycleEvent) {
        self(context, event)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedEvent {
    pub run_id: String,
    pub current_stage: RunStage,
    #[serde(flatten)]
    pub event: LifecycleEvent,
}

/// Listener that keeps every event in memory, in emission order.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// `"<event>:<stage>"` labels, handy for asserting sequences
    pub fn labels(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|recorded| format!("{}:{}", recorded.event.name(), recorded.event.stage()))
            .collect()
    }
}

impl LifecycleListener for EventRecorder {
    fn on_event(&self, context: &RunContext, event: &LifecycleEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedEvent {
                run_id: context.run_id.clone(),
                current_stage: context.current_stage(),
                event: event.clone(),
            });
    }
}
