//! Sessões de conversa: comando pendente por telefone, com expiração
//!
//! Comandos de dois passos (ex.: "buscar empresa" → usuário envia o nome)
//! guardam aqui o que está sendo aguardado. A próxima mensagem do mesmo
//! telefone consome a pendência; pendências vencidas são ignoradas.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Tempo padrão de espera pela resposta do usuário
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 300;

/// O que o bot está aguardando do usuário
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCommand {
    AwaitingCompanyName,
    AwaitingTaxId,
}

#[derive(Debug, Clone)]
struct Session {
    pending: PendingCommand,
    expires_at: Instant,
}

/// Mapa explícito telefone → comando pendente
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Registra (ou substitui) a pendência da sessão
    pub async fn set(&self, session_key: &str, pending: PendingCommand) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            session_key.to_string(),
            Session {
                pending,
                expires_at: Instant::now() + self.ttl,
            },
        );
        tracing::debug!("💬 Sessão '{}' aguardando {:?}", session_key, pending);
    }

    /// Consome a pendência, se existir e não tiver vencido
    pub async fn take(&self, session_key: &str) -> Option<PendingCommand> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.remove(session_key)?;

        if session.expires_at <= Instant::now() {
            tracing::debug!("⌛ Sessão '{}' expirou", session_key);
            return None;
        }
        Some(session.pending)
    }

    /// Consulta sem consumir
    #[cfg(test)]
    pub(crate) async fn peek(&self, session_key: &str) -> Option<PendingCommand> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_key)
            .filter(|s| s.expires_at > Instant::now())
            .map(|s| s.pending)
    }

    /// Remove sessões vencidas, retornando quantas foram removidas
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!("🧹 {} sessões expiradas removidas", removed);
        }
        removed
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_take_consumes_pending() {
        let store = SessionStore::default();
        store.set("5511999990000", PendingCommand::AwaitingCompanyName).await;

        assert_eq!(
            store.peek("5511999990000").await,
            Some(PendingCommand::AwaitingCompanyName)
        );
        assert_eq!(
            store.take("5511999990000").await,
            Some(PendingCommand::AwaitingCompanyName)
        );
        assert_eq!(store.take("5511999990000").await, None);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_by_key() {
        let store = SessionStore::default();
        store.set("a", PendingCommand::AwaitingCompanyName).await;
        store.set("b", PendingCommand::AwaitingTaxId).await;

        assert_eq!(store.take("b").await, Some(PendingCommand::AwaitingTaxId));
        assert_eq!(store.take("a").await, Some(PendingCommand::AwaitingCompanyName));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_is_ignored() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.set("a", PendingCommand::AwaitingTaxId).await;

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.peek("a").await, None);
        assert_eq!(store.take("a").await, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.set("old", PendingCommand::AwaitingTaxId).await;
        tokio::time::advance(Duration::from_secs(45)).await;
        store.set("new", PendingCommand::AwaitingCompanyName).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.peek("new").await, Some(PendingCommand::AwaitingCompanyName));
    }
}
