use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use acessorias_processos::models::SyncKind;
use acessorias_processos::services::SyncReport;
use acessorias_processos::utils::logging::*;
use acessorias_processos::utils::{AppError, AppResult};
use acessorias_processos::AppState;

use super::processes::parse_competence;

const DEFAULT_HISTORY_LIMIT: i64 = 20;

#[derive(Debug, Deserialize, Default)]
pub struct ManualSyncQuery {
    pub kind: Option<String>,
    pub competence: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// Sincronização síncrona disparada pela API (padrão: incremental)
pub async fn manual_sync(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ManualSyncQuery>,
) -> AppResult<Json<SyncReport>> {
    let start_time = Instant::now();
    log_request_received("/api/v1/sync/manual", "POST");

    let kind = match query.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(raw) => raw.parse::<SyncKind>().map_err(|e| {
            log_validation_error("kind", raw);
            AppError::ValidationError(e)
        })?,
        None => SyncKind::Incremental,
    };
    let competence = parse_competence(query.competence.as_deref())?;

    let report = state.sync.run(kind, competence.as_deref()).await?;

    log_request_processed("/api/v1/sync/manual", 200, start_time.elapsed().as_millis() as u64);
    Ok(Json(report))
}

pub async fn sync_status(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    log_request_received("/api/v1/sync/status", "GET");

    let total_processes = state.store.count_processes().await?;
    let body = match state.store.latest_sync_run().await? {
        Some(run) => json!({
            "status": run.status,
            "kind": run.kind,
            "competence": run.competence,
            "started_at": run.started_at,
            "finished_at": run.finished_at,
            "error_message": run.error_message,
            "total_processes": total_processes
        }),
        None => json!({
            "status": "NEVER_RUN",
            "total_processes": total_processes
        }),
    };

    Ok(Json(body))
}

pub async fn sync_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Value>> {
    log_request_received("/api/v1/sync/history", "GET");

    let runs = state
        .store
        .sync_history(query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await?;

    Ok(Json(json!({
        "count": runs.len(),
        "runs": runs
    })))
}
