//! Slate Core: run context, stage lifecycle engine and lifecycle events
//!
//! A run walks a fixed, ordered list of stages. Each stage goes
//! `pending → active → {blocked, completed, failed}`; a blocked stage only
//! becomes active again through an explicit resume. A handler error fails the
//! stage, marks the run `failed` and is returned to the caller.
//!
//! ```text
//! queued → scraping → personas → [segments] → maps → hooks → briefs
//!        → [ssr] → creative → [qa] → pack → done
//! ```
//!
//! Bracketed stages block for manual approval when autopilot is enabled.

pub mod clock;
pub mod context;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod snapshot;
pub mod stage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{RunContext, RunParams};
pub use error::LifecycleError;
pub use events::{EventRecorder, LifecycleEvent, LifecycleListener, RecordedEvent};
pub use lifecycle::{StageLifecycle, AUTOPILOT_PAUSE_REASON};
pub use snapshot::RunStateSnapshot;
pub use stage::{
    autopilot_gates, ParseStageError, RunStage, StageDefinition, StageHandler, StageProgress,
    StageStatus, DEFAULT_LIFECYCLE,
};

/// Re-exported so handler crates implement [`StageHandler`] with the same macro
pub use async_trait::async_trait;
