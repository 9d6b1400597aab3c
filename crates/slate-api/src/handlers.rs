//! API Handlers
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use slate_core::{LifecycleError, RunStage};

use crate::store::{CreateRun, RunStore, StoreError};

pub type AppState = Arc<RunStore>;

/// Store errors rendered as JSON with a matching status
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            StoreError::RunNotFound(_) => StatusCode::NOT_FOUND,
            StoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            StoreError::StageFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            StoreError::Lifecycle(LifecycleError::StageNotFound(_)) => StatusCode::BAD_REQUEST,
            StoreError::Lifecycle(LifecycleError::InvalidLifecycle(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            StoreError::Lifecycle(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.0.to_string() });
        if let StoreError::StageFailed { run_id, source } = &self.0 {
            body["run_id"] = json!(run_id);
            body["reason"] = json!(source.handler_reason());
        }
        (self.status(), Json(body)).into_response()
    }
}

pub async fn create_run(
    State(store): State<AppState>,
    Json(request): Json<CreateRun>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let snapshot = store.create_run(request).await?;
    Ok((StatusCode::CREATED, Json(json!(snapshot))))
}

pub async fn get_run(
    State(store): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!(store.get_run(&run_id).await?)))
}

pub async fn list_stages(
    State(store): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let snapshot = store.get_run(&run_id).await?;
    Ok(Json(json!({
        "run_id": snapshot.run_id,
        "current_stage": snapshot.current_stage,
        "stages": snapshot.stages,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub stage: RunStage,
}

pub async fn resume_run(
    State(store): State<AppState>,
    Path(run_id): Path<String>,
    Json(request): Json<ResumeRequest>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!(store.resume(&run_id, request.stage).await?)))
}

#[derive(Debug, Deserialize)]
pub struct ArtifactQuery {
    #[serde(default)]
    pub stage: Option<RunStage>,
}

pub async fn list_artifacts(
    State(store): State<AppState>,
    Path(run_id): Path<String>,
    Query(query): Query<ArtifactQuery>,
) -> Result<Json<Value>, ApiError> {
    let artifacts = store.list_artifacts(&run_id, query.stage).await?;
    Ok(Json(json!({ "run_id": run_id, "artifacts": artifacts })))
}

pub async fn get_ssr(
    State(store): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let audit = store.ssr_evaluations(&run_id).await?;
    let body = match audit {
        Some(audit) => json!({
            "run_id": run_id,
            "passed": audit.passed(),
            "aggregate_pmf": audit.aggregate_pmf,
            "evaluations": audit.evaluations,
        }),
        None => json!({ "run_id": run_id, "passed": null, "evaluations": [] }),
    };
    Ok(Json(body))
}

pub async fn health(State(store): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "profile": store.profile().name,
        })),
    )
}

pub async fn metrics(State(store): State<AppState>) -> Response {
    match store.metrics().encode() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}
