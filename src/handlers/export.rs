use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use acessorias_processos::utils::logging::*;
use acessorias_processos::utils::AppResult;
use acessorias_processos::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct ExportQuery {
    /// Apenas um regime; sem ele, uma planilha por regime do banco
    pub regime: Option<String>,
}

pub async fn export_spreadsheets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Json<Value>> {
    let start_time = Instant::now();
    log_request_received("/api/v1/export", "POST");

    let files = match query.regime.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(regime) => vec![state.exporter.export_regime(regime).await?],
        None => state.exporter.export_all().await?,
    };
    let files: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();

    log_request_processed("/api/v1/export", 200, start_time.elapsed().as_millis() as u64);
    Ok(Json(json!({
        "count": files.len(),
        "files": files
    })))
}
