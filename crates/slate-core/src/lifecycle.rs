//! Stage lifecycle engine: walks the static stage list, pausing at autopilot
//! gates and failing the run when a handler errors.
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::context::{RunContext, RunParams};
use crate::error::LifecycleError;
use crate::events::{LifecycleEvent, LifecycleListener};
use crate::snapshot::RunStateSnapshot;
use crate::stage::{
    RunStage, StageDefinition, StageHandler, StageProgress, StageStatus, DEFAULT_LIFECYCLE,
};

/// Reason recorded on a stage held at an autopilot gate.
pub const AUTOPILOT_PAUSE_REASON: &str = "autopilot_pause";

/// Ordered finite-state machine over named stages.
///
/// `S` is the per-run runtime handed to every handler. The engine keeps no
/// per-run state of its own: everything lives in the [`RunContext`] and the
/// runtime, so one engine instance serves exactly one run or many runs alike.
pub struct StageLifecycle<S> {
    definitions: Vec<StageDefinition>,
    handlers: Vec<Option<Arc<dyn StageHandler<S>>>>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
    clock: Arc<dyn Clock>,
}

impl<S: Send> StageLifecycle<S> {
    pub fn new(definitions: Vec<StageDefinition>) -> Result<Self, LifecycleError> {
        if definitions.is_empty() {
            return Err(LifecycleError::InvalidLifecycle(
                "lifecycle has no stages".to_string(),
            ));
        }
        for (index, definition) in definitions.iter().enumerate() {
            if definition.name == RunStage::Failed {
                return Err(LifecycleError::InvalidLifecycle(
                    "failed is reserved for terminal runs".to_string(),
                ));
            }
            if definitions[..index]
                .iter()
                .any(|earlier| earlier.name == definition.name)
            {
                return Err(LifecycleError::InvalidLifecycle(format!(
                    "stage {} listed twice",
                    definition.name
                )));
            }
        }

        let handlers = definitions.iter().map(|_| None).collect();
        Ok(Self {
            definitions,
            handlers,
            listeners: Vec::new(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_default_lifecycle() -> Self {
        let definitions = DEFAULT_LIFECYCLE.to_vec();
        let handlers = definitions.iter().map(|_| None).collect();
        Self {
            definitions,
            handlers,
            listeners: Vec::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn definitions(&self) -> &[StageDefinition] {
        &self.definitions
    }

    /// Installs the handler for `stage`, replacing any previous one. Stages
    /// without a handler complete immediately.
    pub fn register_handler<H>(&mut self, stage: RunStage, handler: H) -> Result<(), LifecycleError>
    where
        H: StageHandler<S> + 'static,
    {
        let index = self.index_of(stage)?;
        self.handlers[index] = Some(Arc::new(handler));
        Ok(())
    }

    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: LifecycleListener + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Builds a fresh context: the first stage is active, every other stage
    /// pending.
    pub fn initialize_context(&self, params: RunParams) -> RunContext {
        let now = self.clock.now();
        let stages = self
            .definitions
            .iter()
            .enumerate()
            .map(|(index, definition)| {
                let mut progress = StageProgress::pending(definition.name);
                if index == 0 {
                    progress.status = StageStatus::Active;
                    progress.entered_at = Some(now);
                }
                progress
            })
            .collect();

        RunContext {
            run_id: params.run_id,
            tenant_id: params.tenant_id,
            source_url: params.source_url,
            anchor_set_version: params.anchor_set_version,
            model_revision: params.model_revision,
            locale: params.locale,
            currency: params.currency,
            created_at: now,
            updated_at: now,
            current_stage: self.definitions[0].name,
            autopilot_enabled: params.autopilot_enabled,
            stages,
        }
    }

    /// Advances a freshly initialized run from its first stage until it
    /// blocks, fails or finishes.
    pub async fn start(&self, context: &mut RunContext, state: &mut S) -> Result<(), LifecycleError> {
        self.check_layout(context)?;
        let fresh = context.stages.iter().enumerate().all(|(index, progress)| {
            if index == 0 {
                progress.status == StageStatus::Active
            } else {
                progress.status == StageStatus::Pending
            }
        });
        if !fresh {
            return Err(LifecycleError::AlreadyStarted(context.run_id.clone()));
        }

        let first = self.definitions[0].name;
        self.advance(context, first, state).await
    }

    /// Releases a blocked stage: runs its handler, then keeps advancing.
    ///
    /// Any status other than `blocked` is rejected before anything is touched.
    pub async fn resume_from_blocked(
        &self,
        context: &mut RunContext,
        stage: RunStage,
        state: &mut S,
    ) -> Result<(), LifecycleError> {
        self.check_layout(context)?;
        let index = self.index_of(stage)?;
        let status = context.stages[index].status;
        if status != StageStatus::Blocked {
            return Err(LifecycleError::InvalidResumeState { stage, status });
        }

        let now = self.clock.now();
        let progress = &mut context.stages[index];
        progress.status = StageStatus::Active;
        progress.blocking_reason = None;
        progress.entered_at.get_or_insert(now);
        let progress = progress.clone();
        context.current_stage = stage;
        context.updated_at = now;
        self.emit(context, LifecycleEvent::Started { progress });

        self.execute_stage_handler(context, index, state).await?;
        self.advance(context, stage, state).await
    }

    pub fn snapshot(&self, context: &RunContext) -> RunStateSnapshot {
        context.snapshot()
    }

    async fn advance(
        &self,
        context: &mut RunContext,
        from_stage: RunStage,
        state: &mut S,
    ) -> Result<(), LifecycleError> {
        let start = self.index_of(from_stage)?;

        for index in start..self.definitions.len() {
            let definition = self.definitions[index];
            if context.stages[index].status == StageStatus::Completed {
                continue;
            }

            let now = self.clock.now();
            let progress = &mut context.stages[index];
            progress.status = StageStatus::Active;
            progress.entered_at.get_or_insert(now);
            let started = progress.clone();
            context.current_stage = definition.name;
            context.updated_at = now;
            debug!(run_id = %context.run_id, stage = %definition.name, "advancing stage");
            self.emit(context, LifecycleEvent::Started { progress: started });

            if definition.autopilot_pause && context.autopilot_enabled {
                let progress = &mut context.stages[index];
                progress.status = StageStatus::Blocked;
                progress.blocking_reason = Some(AUTOPILOT_PAUSE_REASON.to_string());
                let blocked = progress.clone();
                self.emit(context, LifecycleEvent::Blocked { progress: blocked });
                return Ok(());
            }

            self.execute_stage_handler(context, index, state).await?;
        }

        Ok(())
    }

    async fn execute_stage_handler(
        &self,
        context: &mut RunContext,
        index: usize,
        state: &mut S,
    ) -> Result<(), LifecycleError> {
        let stage = self.definitions[index].name;
        let outcome = match &self.handlers[index] {
            Some(handler) => handler.handle(context, state).await,
            None => Ok(()),
        };

        let now = self.clock.now();
        match outcome {
            Ok(()) => {
                let progress = &mut context.stages[index];
                progress.status = StageStatus::Completed;
                progress.exited_at = Some(now);
                let completed = progress.clone();
                context.updated_at = now;
                self.emit(context, LifecycleEvent::Completed { progress: completed });
                Ok(())
            }
            Err(error) => {
                let reason = format!("{:#}", error);
                warn!(run_id = %context.run_id, stage = %stage, reason = %reason, "stage handler failed");
                let progress = &mut context.stages[index];
                progress.status = StageStatus::Failed;
                progress.exited_at = Some(now);
                progress.blocking_reason = Some(reason.clone());
                let failed = progress.clone();
                context.current_stage = RunStage::Failed;
                context.updated_at = now;
                self.emit(
                    context,
                    LifecycleEvent::Failed {
                        progress: failed,
                        error: reason.clone(),
                    },
                );
                Err(LifecycleError::HandlerFailure { stage, reason })
            }
        }
    }

    fn emit(&self, context: &RunContext, event: LifecycleEvent) {
        for listener in &self.listeners {
            listener.on_event(context, &event);
        }
    }

    fn index_of(&self, stage: RunStage) -> Result<usize, LifecycleError> {
        self.definitions
            .iter()
            .position(|definition| definition.name == stage)
            .ok_or(LifecycleError::StageNotFound(stage))
    }

    /// Contexts must come from an engine with the same stage list.
    fn check_layout(&self, context: &RunContext) -> Result<(), LifecycleError> {
        let matches = context.stages.len() == self.definitions.len()
            && context
                .stages
                .iter()
                .zip(&self.definitions)
                .all(|(progress, definition)| progress.stage == definition.name);
        if matches {
            Ok(())
        } else {
            Err(LifecycleError::InvalidLifecycle(format!(
                "run {} was initialized with a different stage list",
                context.run_id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::events::EventRecorder;
    use chrono::{TimeZone, Utc};

    struct Noop;

    #[async_trait::async_trait]
    impl StageHandler<Vec<RunStage>> for Noop {
        async fn handle(&self, context: &RunContext, state: &mut Vec<RunStage>) -> anyhow::Result<()> {
            state.push(context.current_stage());
            Ok(())
        }
    }

    fn scenario_a() -> StageLifecycle<Vec<RunStage>> {
        StageLifecycle::new(vec![
            StageDefinition::new(RunStage::Queued),
            StageDefinition::paused(RunStage::Segments),
            StageDefinition::new(RunStage::Done),
        ])
        .unwrap()
        .with_clock(FixedClock(Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap()))
    }

    #[test]
    fn test_rejects_invalid_definitions() {
        assert!(StageLifecycle::<()>::new(vec![]).is_err());
        assert!(StageLifecycle::<()>::new(vec![
            StageDefinition::new(RunStage::Queued),
            StageDefinition::new(RunStage::Queued),
        ])
        .is_err());
        assert!(StageLifecycle::<()>::new(vec![StageDefinition::new(RunStage::Failed)]).is_err());
    }

    #[test]
    fn test_register_handler_for_unknown_stage() {
        let mut machine = scenario_a();
        assert_eq!(
            machine.register_handler(RunStage::Ssr, Noop),
            Err(LifecycleError::StageNotFound(RunStage::Ssr))
        );
    }

    #[tokio::test]
    async fn test_handler_sees_its_stage_as_current() {
        let mut machine = scenario_a();
        machine.register_handler(RunStage::Segments, Noop).unwrap();
        machine.register_handler(RunStage::Done, Noop).unwrap();
        let mut context = machine.initialize_context(RunParams::new("run", "tenant", "https://example.com"));
        let mut seen = Vec::new();

        machine.start(&mut context, &mut seen).await.unwrap();
        assert!(seen.is_empty());
        machine
            .resume_from_blocked(&mut context, RunStage::Segments, &mut seen)
            .await
            .unwrap();

        assert_eq!(seen, vec![RunStage::Segments, RunStage::Done]);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let mut machine = scenario_a();
        let recorder = EventRecorder::new();
        machine.subscribe(recorder.clone());
        let mut context = machine.initialize_context(RunParams::new("run", "tenant", "https://example.com"));
        let mut seen = Vec::new();

        machine.start(&mut context, &mut seen).await.unwrap();
        let before = context.snapshot();
        let events = recorder.events().len();

        assert_eq!(
            machine.start(&mut context, &mut seen).await,
            Err(LifecycleError::AlreadyStarted("run".to_string()))
        );
        assert_eq!(context.snapshot(), before);
        assert_eq!(recorder.events().len(), events);
    }

    #[tokio::test]
    async fn test_blocked_stage_keeps_original_entered_at() {
        let machine = scenario_a();
        let mut context = machine.initialize_context(RunParams::new("run", "tenant", "https://example.com"));
        let mut seen = Vec::new();

        machine.start(&mut context, &mut seen).await.unwrap();
        let entered = context.progress(RunStage::Segments).unwrap().entered_at;
        machine
            .resume_from_blocked(&mut context, RunStage::Segments, &mut seen)
            .await
            .unwrap();

        let progress = context.progress(RunStage::Segments).unwrap();
        assert_eq!(progress.entered_at, entered);
        assert_eq!(progress.blocking_reason, None);
        assert_eq!(progress.status, StageStatus::Completed);
    }

    struct Fetch;

    #[async_trait::async_trait]
    impl StageHandler<Vec<RunStage>> for Fetch {
        async fn handle(&self, _context: &RunContext, _state: &mut Vec<RunStage>) -> anyhow::Result<()> {
            use anyhow::Context;
            Err(anyhow::anyhow!("connection reset")).context("loading listing")
        }
    }

    #[tokio::test]
    async fn test_failure_reason_keeps_error_chain() {
        let mut machine = StageLifecycle::new(vec![
            StageDefinition::new(RunStage::Queued),
            StageDefinition::new(RunStage::Segments),
        ])
        .unwrap();
        machine.register_handler(RunStage::Segments, Fetch).unwrap();
        let mut context = machine.initialize_context(RunParams::new("run", "tenant", "https://example.com"));

        let err = machine.start(&mut context, &mut Vec::new()).await.unwrap_err();
        assert_eq!(err.handler_reason(), Some("loading listing: connection reset"));
        assert_eq!(
            context.progress(RunStage::Segments).unwrap().blocking_reason.as_deref(),
            Some("loading listing: connection reset")
        );
        assert!(context.is_failed());
    }

    #[tokio::test]
    async fn test_foreign_context_is_rejected() {
        let machine = scenario_a();
        let other = StageLifecycle::<Vec<RunStage>>::with_default_lifecycle();
        let mut context = other.initialize_context(RunParams::new("run", "tenant", "https://example.com"));

        let result = machine.start(&mut context, &mut Vec::new()).await;
        assert!(matches!(result, Err(LifecycleError::InvalidLifecycle(_))));
    }
}
