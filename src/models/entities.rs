//! Linhas das tabelas (sqlx::FromRow) expostas pela API

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use super::process::{ProcessStatus, StepKind};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyRow {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub tax_id: Option<String>,
    pub external_id: Option<i64>,
    pub tax_regime: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProcessRow {
    pub id: i64,
    pub external_id: i64,
    pub company_id: i64,
    pub name: String,
    pub title: Option<String>,
    pub competence: String,
    pub status: ProcessStatus,
    pub completion_pct: f64,
    pub total_steps: i64,
    pub done_steps: i64,
    pub elapsed_days: i64,
    pub started_on: Option<NaiveDate>,
    pub finished_on: Option<NaiveDate>,
    pub tax_regime: String,
    pub manager: Option<String>,
    pub department: Option<String>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StepRow {
    pub id: i64,
    pub process_id: i64,
    pub ordinal: i64,
    pub external_id: Option<i64>,
    pub kind: StepKind,
    pub raw_kind: Option<String>,
    pub name: String,
    pub status: Option<String>,
    pub done: bool,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub blocking: bool,
    pub delivery_kind: Option<String>,
    pub delivery_name: Option<String>,
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub process_id: i64,
    pub ordinal: i64,
    pub step_ordinal: i64,
    pub step_external_id: Option<i64>,
    pub question: String,
    pub status: Option<String>,
    pub choices: Json<Vec<String>>,
    pub selected_answer: Option<String>,
    pub action_kind: Option<String>,
    pub action_name: Option<String>,
    pub answered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncKind {
    Full,
    Incremental,
}

impl SyncKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Full => "FULL",
            SyncKind::Incremental => "INCREMENTAL",
        }
    }
}

impl std::str::FromStr for SyncKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" | "completa" => Ok(SyncKind::Full),
            "incremental" => Ok(SyncKind::Incremental),
            other => Err(format!("tipo de sincronização inválido: '{}' (use full ou incremental)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Started,
    Completed,
    Error,
}

/// Registro de uma execução de sincronização (append-only)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub kind: SyncKind,
    pub competence: String,
    pub status: SyncStatus,
    pub total_processes: i64,
    pub new_processes: i64,
    pub updated_processes: i64,
    pub unchanged_processes: i64,
    pub failed_processes: i64,
    pub elapsed_seconds: Option<i64>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Contagem de linhas por tabela
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub companies: i64,
    pub processes: i64,
    pub steps: i64,
    pub branch_questions: i64,
    pub sync_runs: i64,
}

/// Processo com empresa, passos e desdobramentos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDetail {
    #[serde(flatten)]
    pub process: ProcessRow,
    pub company: CompanyRow,
    pub steps: Vec<StepRow>,
    pub branch_questions: Vec<QuestionRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_kind_from_str() {
        assert_eq!("full".parse::<SyncKind>(), Ok(SyncKind::Full));
        assert_eq!("INCREMENTAL".parse::<SyncKind>(), Ok(SyncKind::Incremental));
        assert!("parcial".parse::<SyncKind>().is_err());
    }

    #[test]
    fn test_sync_status_serializes_screaming() {
        assert_eq!(serde_json::to_string(&SyncStatus::Completed).unwrap(), "\"COMPLETED\"");
        assert_eq!(serde_json::to_string(&SyncKind::Incremental).unwrap(), "\"INCREMENTAL\"");
    }
}
