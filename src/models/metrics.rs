use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Métricas do dashboard para uma competência
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub competence: String,
    pub total_processes: i64,
    pub total_companies: i64,
    /// Média simples das taxas de conclusão dos regimes
    pub avg_completion_rate: f64,
    pub regimes: BTreeMap<String, RegimeMetrics>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeMetrics {
    pub total: i64,
    pub completed: i64,
    pub completion_rate: f64,
    pub avg_days: f64,
    pub avg_progress: f64,
    /// Participação do regime no volume da competência (%)
    pub volume_share: f64,
}

/// Agregado por regime vindo do banco
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RegimeAggregate {
    pub tax_regime: String,
    pub total: i64,
    pub completed: i64,
    pub avg_days: f64,
    pub avg_progress: f64,
}
