use tracing::{info, warn, error, debug};
use tracing_subscriber::EnvFilter;

/// Inicializa o subscriber (RUST_LOG, padrão "info")
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // try_init: binários e testes podem chamar mais de uma vez
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_source_api_error(endpoint: &str, error: &str) {
    error!("Acessórias API error: {} - Error: {}", endpoint, error);
}

pub fn log_sync_started(kind: &str, competence: &str, run_id: i64) {
    info!("🔄 Sincronização {} iniciada (competência {}, run #{})", kind, competence, run_id);
}

pub fn log_sync_finished(kind: &str, run_id: i64, new: i64, updated: i64, unchanged: i64, failed: i64, secs: i64) {
    info!(
        "✅ Sincronização {} #{} concluída em {}s: {} novos, {} atualizados, {} sem mudança, {} falhas",
        kind, run_id, secs, new, updated, unchanged, failed
    );
}

pub fn log_sync_failed(kind: &str, run_id: i64, error: &str) {
    error!("❌ Sincronização {} #{} falhou: {}", kind, run_id, error);
}

pub fn log_record_failed(process_id: i64, error: &str) {
    warn!("⚠️ Processo {} ignorado nesta execução: {}", process_id, error);
}

pub fn log_cache_invalidated(competence: &str) {
    debug!("🗑️ Cache de métricas invalidado para {}", competence);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 Acessórias sync server starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
