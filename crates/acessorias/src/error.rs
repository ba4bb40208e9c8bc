//! Tipos de erro para o crate acessorias

use thiserror::Error;

/// Erros do cliente Acessórias
#[derive(Debug, Error)]
pub enum AcessoriasError {
    /// Erro de requisição HTTP
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Erro da API Acessórias (status code não tratado)
    #[error("Acessórias API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Token inválido ou expirado (401)
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Erro de parsing JSON
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Erro de configuração
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 429 persistente mesmo após o cooldown
    #[error("Rate limit exceeded after retry: {0}")]
    RateLimited(String),
}

impl AcessoriasError {
    /// Erros que devem abortar uma sincronização inteira
    pub fn is_fatal(&self) -> bool {
        matches!(self, AcessoriasError::AuthError(_) | AcessoriasError::ConfigError(_))
    }
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, AcessoriasError>;
