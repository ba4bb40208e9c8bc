//! Dados dos relatórios e a fonte que os fornece

use serde::{Deserialize, Serialize};
use std::future::Future;

pub type ReportResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralSummary {
    pub total_companies: i64,
    pub total_processes: i64,
    pub completed: i64,
    pub in_progress: i64,
    /// Processos com 0% e não concluídos
    pub stalled: i64,
    pub avg_progress: f64,
    pub avg_days: f64,
    pub min_days: i64,
    pub max_days: i64,
    pub total_steps: i64,
    pub done_steps: i64,
    pub total_questions: i64,
    pub answered_questions: i64,
}

impl GeneralSummary {
    pub fn completion_rate(&self) -> f64 {
        rate(self.completed, self.total_processes)
    }

    pub fn step_rate(&self) -> f64 {
        rate(self.done_steps, self.total_steps)
    }

    pub fn question_rate(&self) -> f64 {
        rate(self.answered_questions, self.total_questions)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeSummary {
    pub regime: String,
    pub total: i64,
    pub completed: i64,
    pub avg_progress: f64,
    pub avg_days: f64,
}

impl RegimeSummary {
    pub fn completion_rate(&self) -> f64 {
        rate(self.completed, self.total)
    }
}

/// Processo em andamento, para os relatórios de atrasados e parados
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessAlert {
    pub company: String,
    pub tax_id: Option<String>,
    pub regime: String,
    pub completion_pct: f64,
    pub elapsed_days: i64,
    /// Primeiro desdobramento sem resposta, quando houver
    pub waiting_on: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub step_name: String,
    pub pending: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub question: String,
    pub pending: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProcess {
    pub external_id: i64,
    pub name: String,
    pub competence: String,
    pub status: String,
    pub completion_pct: f64,
    pub elapsed_days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyMatch {
    pub name: String,
    pub tax_id: Option<String>,
    pub regime: Option<String>,
    pub processes: Vec<CompanyProcess>,
}

/// Fonte de dados dos relatórios (implementada sobre o banco)
pub trait ReportSource: Send + Sync {
    fn general_summary(&self, competence: &str)
        -> impl Future<Output = ReportResult<GeneralSummary>> + Send;

    fn regime_summaries(&self, competence: &str)
        -> impl Future<Output = ReportResult<Vec<RegimeSummary>>> + Send;

    /// Em andamento ordenados por dias corridos (decrescente)
    fn late_processes(&self, competence: &str, limit: usize)
        -> impl Future<Output = ReportResult<Vec<ProcessAlert>>> + Send;

    /// 0% de progresso e não concluídos
    fn stalled_processes(&self, competence: &str, limit: usize)
        -> impl Future<Output = ReportResult<Vec<ProcessAlert>>> + Send;

    fn bottlenecks(&self, competence: &str, limit: usize)
        -> impl Future<Output = ReportResult<Vec<Bottleneck>>> + Send;

    fn pending_questions(&self, competence: &str, limit: usize)
        -> impl Future<Output = ReportResult<Vec<PendingQuestion>>> + Send;

    /// Busca por nome (sem acentos, parcial) ou por CNPJ (apenas dígitos)
    fn search_companies(&self, term: &str, limit: usize)
        -> impl Future<Output = ReportResult<Vec<CompanyMatch>>> + Send;
}

fn rate(part: i64, total: i64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}
