//! In-memory run registry.
//!
//! Each run owns its lifecycle engine, context and pipeline runtime behind a
//! per-run mutex: create, resume and reads of one run are serialized, while
//! distinct runs proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use slate_core::{
    LifecycleError, LifecycleEvent, RunContext, RunParams, RunStage, RunStateSnapshot,
    StageLifecycle,
};
use slate_quality::QualityProfile;
use slate_stages::{register_pipeline, ArtifactEnvelope, ContentSource, PipelineRuntime, SsrAudit};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};
use uuid::{Builder, Uuid, Variant, Version};

use crate::config::ServerConfig;
use crate::metrics::StageMetrics;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("STORE/NOT_FOUND: run {0} not found")]
    RunNotFound(String),

    #[error("STORE/INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    /// A handler failed; the run is registered and now terminal
    #[error("STORE/STAGE_FAILED: run {run_id}: {source}")]
    StageFailed {
        run_id: String,
        source: LifecycleError,
    },

    #[error("STORE/LIFECYCLE: {0}")]
    Lifecycle(#[from] LifecycleError),
}

impl StoreError {
    fn from_lifecycle(run_id: &str, err: LifecycleError) -> Self {
        match err {
            LifecycleError::HandlerFailure { .. } => StoreError::StageFailed {
                run_id: run_id.to_string(),
                source: err,
            },
            other => StoreError::Lifecycle(other),
        }
    }
}

/// Body of `POST /runs`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRun {
    pub tenant_id: String,
    pub url: String,
    #[serde(default)]
    pub anchor_set_version: Option<String>,
    #[serde(default)]
    pub model_revision: Option<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub autopilot_enabled: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub fast_track: bool,
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

impl CreateRun {
    pub fn new(tenant_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            url: url.into(),
            anchor_set_version: None,
            model_revision: None,
            locale: default_locale(),
            currency: default_currency(),
            autopilot_enabled: false,
            seed: None,
            fast_track: false,
        }
    }
}

/// Identity-bearing fields of a run, after defaults are applied
struct RunIdentity<'a> {
    tenant_id: &'a str,
    url: &'a str,
    anchor_set_version: &'a str,
    model_revision: &'a str,
    locale: &'a str,
    currency: &'a str,
    autopilot_enabled: bool,
    fast_track: bool,
    fingerprint: &'a str,
}

impl RunIdentity<'_> {
    fn digest(&self, seed: Option<u64>) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        let flag = |on: bool| if on { "1" } else { "0" };
        let seed = seed.map(|s| s.to_string());
        let parts = [
            Some(self.tenant_id),
            Some(self.url),
            Some(self.anchor_set_version),
            Some(self.model_revision),
            Some(self.locale),
            Some(self.currency),
            Some(flag(self.autopilot_enabled)),
            Some(flag(self.fast_track)),
            seed.as_deref(),
            Some(self.fingerprint),
        ];
        for part in parts.into_iter().flatten() {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        hasher.finalize()
    }

    /// Seed used when the request names none; fits in 32 bits
    fn seed(&self) -> u64 {
        let bytes = self.digest(None);
        let mut word = [0u8; 4];
        word.copy_from_slice(&bytes.as_bytes()[..4]);
        u64::from(u32::from_be_bytes(word))
    }

    fn run_id(&self, seed: u64) -> Uuid {
        let digest = self.digest(Some(seed));
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        Builder::from_bytes(bytes)
            .with_variant(Variant::RFC4122)
            .with_version(Version::Sha1)
            .into_uuid()
    }
}

struct RunRecord {
    lifecycle: StageLifecycle<PipelineRuntime>,
    context: RunContext,
    runtime: PipelineRuntime,
}

fn log_event(context: &RunContext, event: &LifecycleEvent) {
    let progress = event.progress();
    match event {
        LifecycleEvent::Started { .. } => {
            info!(run_id = %context.run_id, stage = %progress.stage, "Stage started")
        }
        LifecycleEvent::Completed { .. } => {
            info!(run_id = %context.run_id, stage = %progress.stage, "Stage completed")
        }
        LifecycleEvent::Blocked { .. } => warn!(
            run_id = %context.run_id,
            stage = %progress.stage,
            reason = progress.blocking_reason.as_deref().unwrap_or_default(),
            "Stage blocked"
        ),
        LifecycleEvent::Failed { error: cause, .. } => error!(
            run_id = %context.run_id,
            stage = %progress.stage,
            reason = progress.blocking_reason.as_deref().unwrap_or_default(),
            error = %cause,
            "Stage failed"
        ),
    }
}

pub struct RunStore {
    config: ServerConfig,
    fingerprint: String,
    source: Arc<dyn ContentSource>,
    metrics: StageMetrics,
    runs: RwLock<HashMap<String, Arc<Mutex<RunRecord>>>>,
}

impl RunStore {
    pub fn new(config: ServerConfig, source: Arc<dyn ContentSource>, metrics: StageMetrics) -> Self {
        let fingerprint = config.profile.fingerprint();
        Self {
            config,
            fingerprint,
            source,
            metrics,
            runs: RwLock::new(HashMap::new()),
        }
    }

    pub fn profile(&self) -> &QualityProfile {
        &self.config.profile
    }

    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Registers and starts a run. Identical requests resolve to the same run
    /// id; a repeat returns the existing run's snapshot without restarting it.
    pub async fn create_run(&self, request: CreateRun) -> Result<RunStateSnapshot, StoreError> {
        if request.tenant_id.trim().is_empty() {
            return Err(StoreError::InvalidRequest("tenant_id is required".to_string()));
        }
        if request.url.trim().is_empty() {
            return Err(StoreError::InvalidRequest("url is required".to_string()));
        }

        let anchor_set_version = request
            .anchor_set_version
            .clone()
            .unwrap_or_else(|| self.config.anchor_set_version.clone());
        let model_revision = request
            .model_revision
            .clone()
            .unwrap_or_else(|| self.config.model_revision.clone());
        let identity = RunIdentity {
            tenant_id: &request.tenant_id,
            url: &request.url,
            anchor_set_version: &anchor_set_version,
            model_revision: &model_revision,
            locale: &request.locale,
            currency: &request.currency,
            autopilot_enabled: request.autopilot_enabled,
            fast_track: request.fast_track,
            fingerprint: &self.fingerprint,
        };
        let seed = request.seed.unwrap_or_else(|| identity.seed());
        let run_id = identity.run_id(seed).to_string();

        let mut lifecycle = StageLifecycle::with_default_lifecycle();
        register_pipeline(&mut lifecycle, &self.config.profile, self.source.clone())?;
        lifecycle.subscribe(log_event);
        lifecycle.subscribe(self.metrics.clone());

        let params = RunParams::new(run_id.clone(), request.tenant_id, request.url)
            .anchor_set_version(anchor_set_version)
            .model_revision(model_revision)
            .locale(request.locale)
            .currency(request.currency)
            .autopilot(request.autopilot_enabled);
        let context = lifecycle.initialize_context(params);
        let mut runtime = PipelineRuntime::new(seed);
        runtime.fast_track = request.fast_track;

        let record = Arc::new(Mutex::new(RunRecord {
            lifecycle,
            context,
            runtime,
        }));
        let mut guard = record.clone().lock_owned().await;
        {
            let mut runs = self.runs.write().await;
            if let Some(existing) = runs.get(&run_id) {
                let existing = existing.clone();
                drop(runs);
                info!(run_id = %run_id, "Run already registered");
                return Ok(existing.lock().await.context.snapshot());
            }
            runs.insert(run_id.clone(), record);
        }
        info!(run_id = %run_id, seed, "Run created");

        let RunRecord {
            lifecycle,
            context,
            runtime,
        } = &mut *guard;
        lifecycle
            .start(context, runtime)
            .await
            .map_err(|err| StoreError::from_lifecycle(&run_id, err))?;
        Ok(context.snapshot())
    }

    async fn record(&self, run_id: &str) -> Result<Arc<Mutex<RunRecord>>, StoreError> {
        self.runs
            .read()
            .await
            .get(run_id)
            .cloned()
            .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))
    }

    pub async fn get_run(&self, run_id: &str) -> Result<RunStateSnapshot, StoreError> {
        let record = self.record(run_id).await?;
        let guard = record.lock().await;
        Ok(guard.lifecycle.snapshot(&guard.context))
    }

    /// Releases a blocked stage. Concurrent calls for the same run queue on
    /// the run's mutex; a call arriving after the stage moved on is rejected
    /// with the lifecycle's invalid-resume error.
    pub async fn resume(&self, run_id: &str, stage: RunStage) -> Result<RunStateSnapshot, StoreError> {
        let record = self.record(run_id).await?;
        let mut guard = record.lock().await;
        let RunRecord {
            lifecycle,
            context,
            runtime,
        } = &mut *guard;
        lifecycle
            .resume_from_blocked(context, stage, runtime)
            .await
            .map_err(|err| StoreError::from_lifecycle(run_id, err))?;
        Ok(context.snapshot())
    }

    pub async fn list_artifacts(
        &self,
        run_id: &str,
        stage: Option<RunStage>,
    ) -> Result<Vec<ArtifactEnvelope>, StoreError> {
        let record = self.record(run_id).await?;
        let guard = record.lock().await;
        let artifacts = &guard.runtime.artifacts;
        Ok(match stage {
            Some(stage) => artifacts
                .iter()
                .filter(|artifact| artifact.stage == stage)
                .cloned()
                .collect(),
            None => artifacts.clone(),
        })
    }

    pub async fn get_seed(&self, run_id: &str) -> Result<u64, StoreError> {
        let record = self.record(run_id).await?;
        let seed = record.lock().await.runtime.seed;
        Ok(seed)
    }

    /// The run's SSR audit, once its ssr stage has run
    pub async fn ssr_evaluations(&self, run_id: &str) -> Result<Option<SsrAudit>, StoreError> {
        let record = self.record(run_id).await?;
        let audit = record.lock().await.runtime.ssr.clone();
        Ok(audit)
    }

    pub async fn run_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runs.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
