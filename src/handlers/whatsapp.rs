use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use acessorias_processos::middleware::verify_signature;
use acessorias_processos::models::{ChatReply, VerifyQuery, WhatsAppWebhook};
use acessorias_processos::utils::logging::*;
use acessorias_processos::utils::{AppError, AppResult};
use acessorias_processos::AppState;

const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Handshake de verificação do webhook: devolve o `hub.challenge`
pub async fn verify_whatsapp_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> Result<String, StatusCode> {
    log_request_received("/webhook/whatsapp", "GET");

    let subscribe = query.mode.as_deref() == Some("subscribe");
    let token_ok = query.verify_token.as_deref() == Some(state.settings.whatsapp.verify_token.as_str());

    match (subscribe && token_ok, query.challenge) {
        (true, Some(challenge)) => {
            log_info("✅ Webhook do WhatsApp verificado");
            Ok(challenge)
        }
        _ => {
            log_warning("❌ Falha na verificação do webhook do WhatsApp");
            Err(StatusCode::FORBIDDEN)
        }
    }
}

/// Mensagens recebidas: cada texto de gestor autorizado passa pelo menu de comandos
///
/// As respostas voltam no corpo da resposta e ficam no log.
pub async fn handle_whatsapp_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let start_time = Instant::now();
    log_request_received("/webhook/whatsapp", "POST");

    if let Some(secret) = state.settings.whatsapp.app_secret.as_deref().filter(|s| !s.is_empty()) {
        let header = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        if !verify_signature(secret, &body, header) {
            log_validation_error("webhook_signature", "Invalid signature");
            return Err(AppError::Forbidden("assinatura do webhook inválida".to_string()));
        }
    }

    let payload: WhatsAppWebhook = serde_json::from_slice(&body)
        .map_err(|e| AppError::ValidationError(format!("payload inválido: {}", e)))?;

    let mut replies = Vec::new();
    let mut ignored = 0usize;
    for (phone, text) in payload.text_messages() {
        if !state.settings.whatsapp.is_authorized(&phone) {
            log_warning(&format!("🚫 Mensagem de número não autorizado: {}", phone));
            ignored += 1;
            continue;
        }

        let message = state
            .chat
            .process(&state.sessions, &state.store, &phone, &text)
            .await;
        log_info(&format!("📤 Resposta para {} ({} caracteres)", phone, message.chars().count()));
        replies.push(ChatReply { to: phone, message });
    }

    log_request_processed("/webhook/whatsapp", 200, start_time.elapsed().as_millis() as u64);
    Ok(Json(json!({
        "status": "ok",
        "ignored": ignored,
        "replies": replies
    })))
}
