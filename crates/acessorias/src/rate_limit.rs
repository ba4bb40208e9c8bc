//! Rate limiter de janela deslizante
//!
//! A API Acessórias aceita ~90 requisições por minuto. Guardamos o instante das
//! chamadas feitas dentro da janela; ao atingir o limite, a próxima chamada
//! dorme até que a mais antiga saia da janela.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: usize = 90;

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// `max_requests == 0` desativa o limitador
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            calls: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Aguarda até haver espaço na janela e registra a chamada.
    ///
    /// O lock fica retido durante a espera: chamadas concorrentes entram em fila.
    pub async fn acquire(&self) {
        if self.max_requests == 0 {
            return;
        }

        let mut calls = self.calls.lock().await;
        Self::prune(&mut calls, self.window, Instant::now());

        if calls.len() >= self.max_requests {
            if let Some(&oldest) = calls.front() {
                let wait = self.window.saturating_sub(Instant::now().duration_since(oldest));
                tracing::warn!(
                    "⏳ Rate limit atingido ({} req/{}s), aguardando {:.1}s",
                    self.max_requests,
                    self.window.as_secs(),
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
            }
            Self::prune(&mut calls, self.window, Instant::now());
        }

        calls.push_back(Instant::now());
    }

    #[cfg(test)]
    async fn in_window(&self) -> usize {
        let mut calls = self.calls.lock().await;
        Self::prune(&mut calls, self.window, Instant::now());
        calls.len()
    }

    fn prune(calls: &mut VecDeque<Instant>, window: Duration, now: Instant) {
        while let Some(&front) = calls.front() {
            if now.duration_since(front) >= window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}
