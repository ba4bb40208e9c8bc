use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use acessorias_processos::models::ProcessDetail;
use acessorias_processos::services::ProcessFilter;
use acessorias_processos::utils::logging::*;
use acessorias_processos::utils::normalization::normalize_competence;
use acessorias_processos::utils::{AppError, AppResult};
use acessorias_processos::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct ProcessListQuery {
    pub competence: Option<String>,
    pub regime: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Competência opcional da query, normalizada para MM/YYYY
pub fn parse_competence(raw: Option<&str>) -> AppResult<Option<String>> {
    match raw.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(None),
        Some(value) => normalize_competence(value).map(Some).ok_or_else(|| {
            log_validation_error("competence", value);
            AppError::ValidationError(format!("competência inválida: '{}' (use MM/YYYY)", value))
        }),
    }
}

pub async fn list_processes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProcessListQuery>,
) -> AppResult<Json<Value>> {
    log_request_received("/api/v1/processes", "GET");

    let filter = ProcessFilter {
        competence: parse_competence(query.competence.as_deref())?,
        regime: query.regime.filter(|r| !r.trim().is_empty()),
        skip: query.skip.unwrap_or(0),
        limit: query.limit.unwrap_or(0),
    }
    .clamped();

    let processes = state.store.list_processes(&filter).await?;

    Ok(Json(json!({
        "count": processes.len(),
        "skip": filter.skip,
        "limit": filter.limit,
        "processes": processes
    })))
}

pub async fn get_process(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ProcessDetail>> {
    log_request_received("/api/v1/processes/{id}", "GET");

    state
        .store
        .process_detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("processo {} não encontrado", id)))
}
