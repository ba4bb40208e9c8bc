//! Métricas do dashboard e cache em arquivo por competência
//!
//! Arquivo: `{cache.dir}/metrics_{MM_YYYY}.json`. Vale enquanto for mais novo
//! que o TTL (15 min por padrão); a sincronização invalida as competências que
//! alterou.

use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::models::{DashboardMetrics, RegimeMetrics};
use crate::services::store::Store;
use crate::utils::logging::*;
use crate::utils::normalization::competence_file_key;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn rate(part: i64, total: i64) -> f64 {
    if total > 0 {
        round2(part as f64 / total as f64 * 100.0)
    } else {
        0.0
    }
}

/// Calcula as métricas de uma competência direto do banco
pub async fn compute_dashboard_metrics(store: &Store, competence: &str) -> Result<DashboardMetrics, sqlx::Error> {
    let aggregates = store.regime_aggregates(competence).await?;
    let total_companies = store.count_companies_in(competence).await?;
    let total_processes: i64 = aggregates.iter().map(|a| a.total).sum();

    let regimes: BTreeMap<String, RegimeMetrics> = aggregates
        .iter()
        .map(|a| {
            (
                a.tax_regime.clone(),
                RegimeMetrics {
                    total: a.total,
                    completed: a.completed,
                    completion_rate: rate(a.completed, a.total),
                    avg_days: round2(a.avg_days),
                    avg_progress: round2(a.avg_progress),
                    volume_share: rate(a.total, total_processes),
                },
            )
        })
        .collect();

    let avg_completion_rate = if regimes.is_empty() {
        0.0
    } else {
        round2(regimes.values().map(|r| r.completion_rate).sum::<f64>() / regimes.len() as f64)
    };

    Ok(DashboardMetrics {
        competence: competence.to_string(),
        total_processes,
        total_companies,
        avg_completion_rate,
        regimes,
        generated_at: Utc::now(),
    })
}

#[derive(Debug, Clone)]
pub struct MetricsCache {
    dir: PathBuf,
    ttl: Duration,
}

impl MetricsCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { dir: dir.into(), ttl }
    }

    fn path_for(&self, competence: &str) -> PathBuf {
        self.dir
            .join(format!("metrics_{}.json", competence_file_key(competence)))
    }

    /// Métricas em cache, apenas se o arquivo ainda estiver dentro do TTL
    pub async fn get(&self, competence: &str) -> Option<DashboardMetrics> {
        let path = self.path_for(competence);
        let metadata = tokio::fs::metadata(&path).await.ok()?;
        let modified = metadata.modified().ok()?;
        let age = SystemTime::now().duration_since(modified).unwrap_or_default();
        if age >= self.ttl {
            return None;
        }

        let bytes = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                log_warning(&format!("⚠️ Cache de métricas corrompido em {}: {}", path.display(), e));
                None
            }
        }
    }

    pub async fn put(&self, metrics: &DashboardMetrics) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(metrics)?;
        tokio::fs::write(self.path_for(&metrics.competence), bytes).await
    }

    /// Remove o arquivo da competência; `true` se existia
    pub async fn invalidate(&self, competence: &str) -> bool {
        match tokio::fs::remove_file(self.path_for(competence)).await {
            Ok(()) => {
                log_cache_invalidated(competence);
                true
            }
            Err(_) => false,
        }
    }
}

/// Métricas do cache quando frescas; senão calcula e grava. Retorna (métricas, veio do cache)
pub async fn dashboard_metrics(
    store: &Store,
    cache: &MetricsCache,
    competence: &str,
) -> Result<(DashboardMetrics, bool), sqlx::Error> {
    if let Some(cached) = cache.get(competence).await {
        return Ok((cached, true));
    }

    let metrics = compute_dashboard_metrics(store, competence).await?;
    if let Err(e) = cache.put(&metrics).await {
        log_warning(&format!("⚠️ Não foi possível gravar cache de métricas: {}", e));
    }
    Ok((metrics, false))
}
