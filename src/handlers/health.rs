use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use acessorias_processos::utils::logging::*;
use acessorias_processos::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    log_health_check();

    let database = match state.store.count_processes().await {
        Ok(count) => json!({ "status": "connected", "processes": count }),
        Err(e) => {
            log_error(&format!("❌ Banco indisponível no health check: {}", e));
            json!({ "status": "error", "error": e.to_string() })
        }
    };
    let healthy = database["status"] == "connected";

    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "service": "acessorias-processos",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "database": database
        })),
    )
}

pub async fn ready_check(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    let database_status = match state.store.ping().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };

    // Testa a conexão com a Acessórias
    let acessorias_status = match state.sync.client().test_connection().await {
        Ok(true) => "connected",
        Ok(false) => {
            log_source_api_error("test_connection", "sem resposta válida da listagem");
            "disconnected"
        }
        Err(e) => {
            log_source_api_error("test_connection", &e.to_string());
            "disconnected"
        }
    };

    let overall_ready = database_status == "connected" && acessorias_status == "connected";

    let response = json!({
        "ready": overall_ready,
        "service": "acessorias-processos",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "dependencies": {
            "database": { "status": database_status },
            "acessorias": {
                "status": acessorias_status,
                "base_url": state.sync.client().base_url()
            }
        }
    });

    if overall_ready {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
