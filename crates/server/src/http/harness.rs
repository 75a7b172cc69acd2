// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/harness/*` handlers: run lifecycle, artifact retrieval, and
//! summary narration (§4.9-§4.14, §6.2).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use serde::Deserialize;

use dashboard_cli_session::narrator;
use dashboard_core::error::{ErrorCode, ServiceError};
use dashboard_harness::artifact::{ArtifactKind, ArtifactStore};
use dashboard_harness::run::{TaskInput, MAX_SUBTASKS};

use crate::http::api_error;
use crate::state::AppState;

pub async fn harness_config(State(state): State<Arc<AppState>>) -> Response {
    let config = &state.harness.config;
    Json(serde_json::json!({
        "ok": true,
        "config": {
            "sharedReposRoot": config.shared_repos_root.to_string_lossy(),
            "gitRemote": config.remote,
            "maxSubtasks": MAX_SUBTASKS,
        },
        "personas": state.harness.personas,
    }))
    .into_response()
}

pub async fn list_runs(State(state): State<Arc<AppState>>) -> Response {
    Json(serde_json::json!({ "ok": true, "runs": state.harness.list_runs().await })).into_response()
}

fn validate_task(task: &TaskInput) -> anyhow::Result<()> {
    if task.title.trim().is_empty() || task.objective.trim().is_empty() || task.repo_path.trim().is_empty() {
        return Err(
            ServiceError::new(ErrorCode::InvalidInput, "title, repoPath, and objective are required").into()
        );
    }
    if task.subtask_count > MAX_SUBTASKS {
        return Err(ServiceError::new(
            ErrorCode::InvalidInput,
            format!("subtaskCount must be at most {MAX_SUBTASKS}"),
        )
        .into());
    }
    Ok(())
}

pub async fn create_run(State(state): State<Arc<AppState>>, Json(task): Json<TaskInput>) -> Response {
    if let Err(e) = validate_task(&task) {
        return api_error(e);
    }
    let run = state.harness.create_run(task).await;
    Json(serde_json::json!({ "ok": true, "run": run.snapshot().await })).into_response()
}

pub async fn get_run(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.harness.get(&id).await {
        Ok(run) => Json(serde_json::json!({ "ok": true, "run": run.snapshot().await })).into_response(),
        Err(e) => api_error(e),
    }
}

pub async fn stop_run(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.harness.request_cancel(&id).await {
        Ok(()) => match state.harness.get(&id).await {
            Ok(run) => Json(serde_json::json!({ "ok": true, "run": run.snapshot().await })).into_response(),
            Err(e) => api_error(e),
        },
        Err(e) => api_error(e),
    }
}

pub async fn list_artifacts(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.harness.get(&id).await {
        Ok(run) => {
            let snapshot = run.snapshot().await;
            Json(serde_json::json!({ "ok": true, "artifacts": snapshot.artifacts })).into_response()
        }
        Err(e) => api_error(e),
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ArtifactQuery {
    #[serde(default)]
    pub raw: bool,
}

pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path((id, aid)): Path<(String, String)>,
    Query(query): Query<ArtifactQuery>,
) -> Response {
    match get_artifact_inner(&state, &id, &aid, query.raw).await {
        Ok(resp) => resp,
        Err(e) => api_error(e),
    }
}

async fn get_artifact_inner(state: &AppState, id: &str, aid: &str, raw: bool) -> anyhow::Result<Response> {
    let run = state.harness.get(id).await?;
    let snapshot = run.snapshot().await;
    let record = snapshot
        .artifacts
        .iter()
        .find(|a| a.id == aid)
        .cloned()
        .ok_or_else(|| ServiceError::new(ErrorCode::UnknownTarget, format!("unknown artifact {aid}")))?;

    let store = ArtifactStore::new(state.harness.config.artifact_root(id));
    let bytes = store.read_bytes(&record.rel_path).await?;

    if raw {
        return Ok((
            [(header::CONTENT_TYPE, record.mime.clone())],
            bytes,
        )
            .into_response());
    }

    let body = match record.kind {
        ArtifactKind::Text | ArtifactKind::Json => {
            serde_json::json!({ "content": String::from_utf8_lossy(&bytes) })
        }
        ArtifactKind::Image | ArtifactKind::File => {
            serde_json::json!({ "contentBase64": base64::engine::general_purpose::STANDARD.encode(&bytes) })
        }
    };

    Ok(Json(serde_json::json!({ "ok": true, "artifact": record, "body": body })).into_response())
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NarrateSummaryBody {
    pub persona_id: Option<String>,
}

pub async fn narrate_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<NarrateSummaryBody>,
) -> Response {
    match narrate(&state, &id, body).await {
        Ok(result) => Json(serde_json::json!({ "ok": true, "narration": result })).into_response(),
        Err(e) => api_error(e),
    }
}

async fn narrate(state: &AppState, id: &str, body: NarrateSummaryBody) -> anyhow::Result<narrator::NarrationResult> {
    let run = state.harness.get(id).await?;
    let snapshot = run.snapshot().await;
    let summary_text = snapshot
        .summary_text
        .ok_or_else(|| ServiceError::new(ErrorCode::NoCapturedOutput, "run has no summary yet"))?;
    narrator::narrate_summary_text(
        &summary_text,
        &state.personas,
        state.llm.as_ref(),
        state.tts.as_ref(),
        body.persona_id.as_deref(),
        &format!("Run {id} summary"),
    )
    .await
}

#[cfg(test)]
#[path = "harness_tests.rs"]
mod tests;
