/// Middleware de autenticação para endpoints administrativos
///
/// Valida que a requisição contém um API key válido no header X-Admin-Key.
/// Protege a sincronização manual e a exportação de planilhas.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use super::signature::constant_time_eq;
use crate::AppState;

/// Resultado da checagem da chave administrativa
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAccess {
    Granted,
    /// Sem chave configurada fora de produção
    GrantedWithoutKey,
    Denied,
    /// Sem chave configurada em produção
    NotConfigured,
}

/// Decide o acesso; chave configurada vazia conta como ausente
pub fn check_admin_access(expected: Option<&str>, provided: Option<&str>, is_production: bool) -> AdminAccess {
    let expected = expected.map(str::trim).filter(|k| !k.is_empty());

    match (expected, provided, is_production) {
        (Some(expected), Some(provided), _)
            if constant_time_eq(expected.as_bytes(), provided.trim().as_bytes()) =>
        {
            AdminAccess::Granted
        }
        (Some(_), _, _) => AdminAccess::Denied,
        (None, _, false) => AdminAccess::GrantedWithoutKey,
        (None, _, true) => AdminAccess::NotConfigured,
    }
}

/// Middleware que requer API key para acesso às rotas administrativas
///
/// # Uso na requisição
///
/// ```bash
/// curl -X POST -H "X-Admin-Key: sua-chave" \
///   "http://localhost:8080/api/v1/sync/manual?kind=INCREMENTAL"
/// ```
///
/// # Respostas
///
/// - **401 Unauthorized**: Key ausente ou inválido
/// - **503 Service Unavailable**: `server.admin_api_key` ausente em produção
///
/// Em desenvolvimento, sem chave configurada, o acesso é liberado com warning.
pub async fn require_admin_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let provided_key = headers
        .get("X-Admin-Key")
        .and_then(|v| v.to_str().ok());

    let server = &state.settings.server;
    match check_admin_access(server.admin_api_key.as_deref(), provided_key, server.is_production()) {
        AdminAccess::Granted => {
            tracing::debug!("✅ Admin access granted");
            Ok(next.run(request).await)
        }
        AdminAccess::GrantedWithoutKey => {
            tracing::warn!(
                "⚠️  ADMIN_API_KEY não configurado - acesso liberado em modo desenvolvimento"
            );
            Ok(next.run(request).await)
        }
        AdminAccess::Denied => {
            tracing::warn!(
                "❌ Admin access denied - Invalid or missing X-Admin-Key: {:?}",
                provided_key.map(|_| "<redacted>")
            );
            Err(unauthorized_response())
        }
        AdminAccess::NotConfigured => {
            tracing::error!("🚨 ADMIN_API_KEY não configurado em produção! Bloqueando acesso admin.");
            Err(service_unavailable_response())
        }
    }
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "Unauthorized",
            "message": "Missing or invalid X-Admin-Key header",
            "status": 401
        })),
    )
        .into_response()
}

fn service_unavailable_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": "Service Unavailable",
            "message": "ADMIN_API_KEY not configured on server",
            "status": 503
        })),
    )
        .into_response()
}
