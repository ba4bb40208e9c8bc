//! Cliente HTTP para a API Acessórias

use crate::error::{AcessoriasError, Result};
use crate::rate_limit::{RateLimiter, DEFAULT_MAX_REQUESTS_PER_MINUTE};
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.acessorias.com";

/// Opções do cliente (timeouts, rate limit, pausas)
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// 0 desativa o rate limiter
    pub max_requests_per_minute: usize,
    /// Pausa antes de repetir uma chamada que retornou 429 ou 5xx
    pub retry_cooldown: Duration,
    /// Pausa entre páginas da listagem
    pub page_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            max_requests_per_minute: DEFAULT_MAX_REQUESTS_PER_MINUTE,
            retry_cooldown: Duration::from_secs(60),
            page_delay: Duration::from_millis(500),
        }
    }
}

/// Cliente para interagir com a API Acessórias
///
/// Todas as chamadas passam pelo rate limiter compartilhado entre os clones.
///
/// # Semântica de resposta
///
/// - 2xx com corpo: JSON
/// - 204 / corpo vazio / 404: ausente (`None`)
/// - 401: [`AcessoriasError::AuthError`]
/// - 429 e 5xx: aguarda o cooldown e tenta mais uma vez
/// - Timeout e falha de rede: ausente, com log
#[derive(Clone)]
pub struct AcessoriasClient {
    http_client: HttpClient,
    api_token: String,
    base_url: String,
    limiter: Arc<RateLimiter>,
    retry_cooldown: Duration,
    page_delay: Duration,
}

impl AcessoriasClient {
    /// Cria um cliente com as opções padrão
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::with_options(api_token, ClientOptions::default())
    }

    pub fn with_options(api_token: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(AcessoriasError::ConfigError(
                "API token da Acessórias não configurado".to_string(),
            ));
        }

        let http_client = HttpClient::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|e| AcessoriasError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_token,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            limiter: Arc::new(RateLimiter::per_minute(options.max_requests_per_minute)),
            retry_cooldown: options.retry_cooldown,
            page_delay: options.page_delay,
        })
    }

    /// Executa um GET e devolve o JSON, ou `None` quando o recurso está ausente
    pub(crate) async fn get_json(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut retried = false;

        loop {
            self.limiter.acquire().await;
            tracing::debug!("GET {} {:?}", url, query);

            let response = match self
                .http_client
                .get(&url)
                .bearer_auth(&self.api_token)
                .header("Accept", "application/json")
                .query(query)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    tracing::warn!("⏱️ Timeout em {}: {}", endpoint, e);
                    return Ok(None);
                }
                Err(e) => {
                    tracing::error!("❌ Falha de rede em {}: {}", endpoint, e);
                    return Ok(None);
                }
            };

            let status = response.status();

            if status == StatusCode::NO_CONTENT {
                return Ok(None);
            }

            if status.is_success() {
                let body = match response.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        tracing::error!("❌ Falha ao ler corpo de {}: {}", endpoint, e);
                        return Ok(None);
                    }
                };
                if body.trim().is_empty() {
                    return Ok(None);
                }
                return match serde_json::from_str::<Value>(&body) {
                    Ok(json) => Ok(Some(json)),
                    Err(e) => {
                        tracing::error!("❌ JSON inválido em {}: {}", endpoint, e);
                        Ok(None)
                    }
                };
            }

            match status {
                StatusCode::UNAUTHORIZED => {
                    tracing::error!("🔒 Token da Acessórias rejeitado em {}", endpoint);
                    return Err(AcessoriasError::AuthError(format!(
                        "401 Unauthorized em {}",
                        endpoint
                    )));
                }
                StatusCode::NOT_FOUND => {
                    tracing::debug!("Recurso não encontrado: {}", endpoint);
                    return Ok(None);
                }
                StatusCode::TOO_MANY_REQUESTS if !retried => {
                    tracing::warn!(
                        "⚠️ 429 em {}, aguardando {}s antes de tentar novamente",
                        endpoint,
                        self.retry_cooldown.as_secs()
                    );
                    tokio::time::sleep(self.retry_cooldown).await;
                    retried = true;
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    return Err(AcessoriasError::RateLimited(endpoint.to_string()));
                }
                s if s.is_server_error() && !retried => {
                    tracing::warn!(
                        "⚠️ Erro {} em {}, tentando novamente em {}s",
                        s.as_u16(),
                        endpoint,
                        self.retry_cooldown.as_secs()
                    );
                    tokio::time::sleep(self.retry_cooldown).await;
                    retried = true;
                }
                s => {
                    let message = Self::error_message(response).await;
                    tracing::error!("❌ Acessórias API error ({}) em {}: {}", s.as_u16(), endpoint, message);
                    return Ok(None);
                }
            }
        }
    }

    /// GET sem retry: `true` para qualquer 2xx (inclusive 204 e lista vazia)
    ///
    /// Falha de rede, timeout, 404 e 5xx dão `false`; 401 é erro.
    pub(crate) async fn reachable(&self, endpoint: &str, query: &[(&str, String)]) -> Result<bool> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.limiter.acquire().await;

        let response = match self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_token)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("⚠️ Acessórias inacessível em {}: {}", endpoint, e);
                return Ok(false);
            }
        };

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(AcessoriasError::AuthError(format!(
                "401 Unauthorized em {}",
                endpoint
            ))),
            s if s.is_success() => Ok(true),
            s => {
                tracing::warn!("⚠️ Acessórias respondeu {} em {}", s.as_u16(), endpoint);
                Ok(false)
            }
        }
    }

    /// Extrai a mensagem de erro do corpo (JSON ou texto)
    async fn error_message(response: reqwest::Response) -> String {
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        match serde_json::from_str::<Value>(&body) {
            Ok(json) => json
                .get("message")
                .or_else(|| json.get("error"))
                .or_else(|| json.get("msg"))
                .and_then(|v| v.as_str())
                .unwrap_or(&body)
                .to_string(),
            Err(_) => body,
        }
    }

    pub(crate) fn page_delay(&self) -> Duration {
        self.page_delay
    }

    /// Obtém a URL base
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
