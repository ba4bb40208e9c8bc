// Biblioteca da sincronização de processos da Acessórias
// Expõe módulos para uso nos binários (servidor e cron) e em testes

pub mod config;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use acessorias::AcessoriasClient;
use mensageria::{CommandProcessor, SessionStore};

// AppState é definido aqui para ser compartilhado
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: services::Store,
    pub sync: Arc<services::SyncService>,
    pub metrics_cache: services::MetricsCache,
    pub exporter: Arc<services::SpreadsheetExporter>,
    pub sessions: SessionStore,
    pub chat: CommandProcessor,
}

impl AppState {
    /// Monta os serviços a partir das configurações, banco e cliente já prontos
    pub fn new(settings: config::Settings, store: services::Store, client: AcessoriasClient) -> Self {
        let metrics_cache = services::MetricsCache::new(&settings.cache.dir, settings.cache_ttl());
        let sync = Arc::new(services::SyncService::new(
            client,
            store.clone(),
            metrics_cache.clone(),
            settings.sync.clone(),
        ));
        let exporter = Arc::new(services::SpreadsheetExporter::new(
            store.clone(),
            &settings.export.output_dir,
        ));
        let sessions = SessionStore::new(Duration::from_secs(settings.whatsapp.session_ttl_seconds));
        let chat = CommandProcessor::new(settings.sync.default_competence.clone())
            .with_list_limit(settings.whatsapp.list_limit);

        Self {
            settings,
            store,
            sync,
            metrics_cache,
            exporter,
            sessions,
            chat,
        }
    }
}
