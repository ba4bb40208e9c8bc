use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, Environment, File};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub acessorias: AcessoriasSettings,
    pub sync: SyncSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub export: ExportSettings,
    pub whatsapp: WhatsAppSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// "development" libera rotas admin sem chave configurada
    pub environment: String,
    pub admin_api_key: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: "development".to_string(),
            admin_api_key: None,
        }
    }
}

impl ServerSettings {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AcessoriasSettings {
    pub token: String,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    /// 0 desativa o rate limiter
    pub max_requests_per_minute: usize,
    pub retry_cooldown_seconds: u64,
    pub page_delay_ms: u64,
}

impl Default for AcessoriasSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: acessorias::client::DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
            connect_timeout_seconds: 5,
            max_requests_per_minute: 90,
            retry_cooldown_seconds: 60,
            page_delay_ms: 500,
        }
    }
}

impl AcessoriasSettings {
    pub fn client_options(&self) -> acessorias::ClientOptions {
        acessorias::ClientOptions {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
            max_requests_per_minute: self.max_requests_per_minute,
            retry_cooldown: Duration::from_secs(self.retry_cooldown_seconds),
            page_delay: Duration::from_millis(self.page_delay_ms),
        }
    }
}

/// Regime tributário sincronizado: código interno + nome do modelo de processo na Acessórias
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RegimeSettings {
    pub code: String,
    pub process_name: String,
}

impl RegimeSettings {
    pub fn new(code: &str, process_name: &str) -> Self {
        Self {
            code: code.to_string(),
            process_name: process_name.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SyncSettings {
    /// Detalhes buscados em paralelo por lote
    pub batch_size: usize,
    /// Pausa entre lotes
    pub batch_delay_ms: u64,
    pub default_competence: String,
    /// Filtros ProcStatus da listagem ("A" em andamento, "C" concluídos)
    pub status_filters: Vec<String>,
    pub regimes: Vec<RegimeSettings>,
    /// Sincronização incremental periódica dentro do servidor (0 = desativada)
    pub interval_minutes: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay_ms: 1000,
            default_competence: "10/2025".to_string(),
            status_filters: vec!["A".to_string(), "C".to_string()],
            regimes: default_regimes(),
            interval_minutes: 0,
        }
    }
}

fn default_regimes() -> Vec<RegimeSettings> {
    vec![
        RegimeSettings::new("SimplesNacional", "Simples Nacional — Mensal"),
        RegimeSettings::new("LucroPresumido_Servicos", "Lucro Presumido - Serviços"),
        RegimeSettings::new(
            "LucroPresumido_Comercio",
            "Lucro Presumido - Comércio, Industria e Serviços",
        ),
        RegimeSettings::new("LucroReal_Comercio", "Lucro Real - Comércio e Industria"),
        RegimeSettings::new("LucroReal_Servicos", "Lucro Real - Serviços"),
    ]
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://data/acessorias.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CacheSettings {
    pub dir: String,
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: "cache".to_string(),
            ttl_seconds: 900,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ExportSettings {
    pub output_dir: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: "exports".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WhatsAppSettings {
    pub verify_token: String,
    /// Segredo do app para validar X-Hub-Signature-256 (opcional)
    pub app_secret: Option<String>,
    /// Telefones autorizados; lista vazia libera todos (desenvolvimento)
    pub authorized_managers: Vec<String>,
    pub session_ttl_seconds: u64,
    /// Itens por lista nas respostas do menu
    pub list_limit: usize,
}

impl Default for WhatsAppSettings {
    fn default() -> Self {
        Self {
            verify_token: "acessorias_verify".to_string(),
            app_secret: None,
            authorized_managers: Vec::new(),
            session_ttl_seconds: mensageria::session::DEFAULT_SESSION_TTL_SECONDS,
            list_limit: 10,
        }
    }
}

impl WhatsAppSettings {
    pub fn is_authorized(&self, phone: &str) -> bool {
        self.authorized_managers.is_empty()
            || self.authorized_managers.iter().any(|p| p.trim() == phone.trim())
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .set_override("server.environment", run_mode.clone())?;

        // Variáveis de ambiente específicas
        if let Ok(token) = std::env::var("ACESSORIAS_API_TOKEN") {
            builder = builder.set_override("acessorias.token", token)?;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }
        if let Ok(key) = std::env::var("ADMIN_API_KEY") {
            builder = builder.set_override("server.admin_api_key", key)?;
        }
        if let Ok(token) = std::env::var("WHATSAPP_VERIFY_TOKEN") {
            builder = builder.set_override("whatsapp.verify_token", token)?;
        }
        if let Ok(secret) = std::env::var("WHATSAPP_APP_SECRET") {
            builder = builder.set_override("whatsapp.app_secret", secret)?;
        }

        // ACESSORIAS__SYNC__BATCH_SIZE=10 etc.
        builder = builder.add_source(
            Environment::with_prefix("ACESSORIAS")
                .prefix_separator("__")
                .separator("__"),
        );

        let s = builder.build()?;

        s.try_deserialize()
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.sync.batch_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.sync.batch_size, 5);
        assert_eq!(settings.sync.default_competence, "10/2025");
        assert_eq!(settings.sync.regimes.len(), 5);
        assert_eq!(settings.cache.ttl_seconds, 900);
        assert_eq!(settings.acessorias.max_requests_per_minute, 90);
        assert!(!settings.server.is_production());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::builder()
            .add_source(File::from_str(
                "[sync]\nbatch_size = 10\n\n[[sync.regimes]]\ncode = \"LucroReal_Servicos\"\nprocess_name = \"Lucro Real - Serviços\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let settings: Settings = config.try_deserialize().unwrap();
        assert_eq!(settings.sync.batch_size, 10);
        assert_eq!(settings.sync.batch_delay_ms, 1000);
        assert_eq!(
            settings.sync.regimes,
            vec![RegimeSettings::new("LucroReal_Servicos", "Lucro Real - Serviços")]
        );
        assert_eq!(settings.database.url, "sqlite://data/acessorias.db");
    }

    #[test]
    fn test_authorized_managers() {
        let mut whatsapp = WhatsAppSettings::default();
        assert!(whatsapp.is_authorized("5511999990000"));

        whatsapp.authorized_managers = vec!["5511999990000".to_string()];
        assert!(whatsapp.is_authorized("5511999990000"));
        assert!(!whatsapp.is_authorized("5511888880000"));
    }
}
