use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use acessorias_processos::utils::logging::*;
use acessorias_processos::utils::{AppError, AppResult};
use acessorias_processos::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_companies(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Value>> {
    log_request_received("/api/v1/companies", "GET");

    let companies = state
        .store
        .list_companies(page.skip.unwrap_or(0), page.limit.unwrap_or(0))
        .await?;

    Ok(Json(json!({
        "count": companies.len(),
        "companies": companies
    })))
}

pub async fn company_processes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    log_request_received("/api/v1/companies/{id}/processes", "GET");

    let company = state
        .store
        .get_company(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("empresa {} não encontrada", id)))?;
    let processes = state.store.processes_for_company(id).await?;

    Ok(Json(json!({
        "company": company,
        "count": processes.len(),
        "processes": processes
    })))
}
