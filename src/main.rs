/// Servidor da sincronização de processos da Acessórias
///
/// Arquitetura:
/// - API REST de consulta (processos, empresas, dashboard, histórico de sync)
/// - Sincronização manual (admin) e periódica opcional, gravando no SQLite local
/// - Exportação de planilhas por regime (admin)
/// - Webhook do WhatsApp com menu de comandos para gestores

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use acessorias::AcessoriasClient;
use acessorias_processos::{config, services, utils, AppState};

mod handlers;

use config::Settings;
use utils::{logging::*, AppError};

/// Intervalo da limpeza de sessões vencidas do WhatsApp
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 🔧 Carregar variáveis de ambiente do arquivo .env (se existir)
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    init_tracing();
    if dotenv_loaded {
        tracing::info!("✅ Arquivo .env carregado com sucesso");
    } else {
        tracing::debug!("Arquivo .env não encontrado - usando variáveis de ambiente do sistema");
    }

    // Carregar configurações
    let settings = Settings::new()
        .map_err(|e| AppError::ConfigError(format!("Failed to load settings: {}", e)))?;

    log_config_loaded(&settings.server.environment);

    if settings.acessorias.token.is_empty() {
        log_warning("⚠️ ACESSORIAS_API_TOKEN não configurado - sincronizações vão falhar");
    }

    let store = services::Store::connect(&settings.database.url, settings.database.max_connections)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to open database: {}", e)))?;
    log_info(&format!("🗄️ Banco pronto em {}", settings.database.url));

    let client = AcessoriasClient::with_options(
        settings.acessorias.token.clone(),
        settings.acessorias.client_options(),
    )
    .map_err(|e| AppError::ConfigError(format!("Failed to create Acessórias client: {}", e)))?;
    log_info(&format!("⚡ Cliente Acessórias configurado ({})", client.base_url()));

    // Inicializar estado da aplicação
    let app_state = Arc::new(AppState::new(settings.clone(), store, client));

    // Sincronização periódica (opcional)
    let _periodic = app_state
        .sync
        .clone()
        .spawn_periodic(settings.sync.interval_minutes);

    // Limpeza periódica das sessões do WhatsApp
    let sessions = app_state.sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = sessions.purge_expired().await;
            if purged > 0 {
                tracing::debug!("🧹 {} sessões do WhatsApp expiradas removidas", purged);
            }
        }
    });

    let app = handlers::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Iniciar servidor
    let port = settings.server.port;
    let listener = TcpListener::bind(format!("{}:{}", settings.server.host, port)).await?;

    log_server_startup(port);
    log_server_ready(port);

    // Graceful shutdown com signal handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error(&format!("❌ Falha ao instalar handler de Ctrl+C: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log_error(&format!("❌ Falha ao instalar handler de SIGTERM: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
