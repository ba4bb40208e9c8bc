use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use acessorias_processos::services::dashboard_metrics;
use acessorias_processos::utils::logging::*;
use acessorias_processos::utils::AppResult;
use acessorias_processos::AppState;

use super::processes::parse_competence;

#[derive(Debug, Deserialize, Default)]
pub struct MetricsQuery {
    pub competence: Option<String>,
}

/// Métricas da competência (padrão: a configurada), servidas do cache quando frescas
pub async fn get_dashboard_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> AppResult<Json<Value>> {
    let start_time = Instant::now();
    log_request_received("/api/v1/dashboard/metrics", "GET");

    let competence = parse_competence(query.competence.as_deref())?
        .unwrap_or_else(|| state.settings.sync.default_competence.clone());

    let (metrics, from_cache) =
        dashboard_metrics(&state.store, &state.metrics_cache, &competence).await?;

    log_request_processed(
        "/api/v1/dashboard/metrics",
        200,
        start_time.elapsed().as_millis() as u64,
    );

    Ok(Json(json!({
        "from_cache": from_cache,
        "metrics": metrics
    })))
}
