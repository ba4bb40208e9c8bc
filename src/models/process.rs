//! Modelo achatado de um processo (cabeçalho + passos + desdobramentos)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::utils::normalization::normalize_string;

/// Situação do processo no nosso banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    Pending,
    InProgress,
    Completed,
}

impl ProcessStatus {
    /// Interpreta o texto livre de `ProcStatus` ("Concluído", "Em andamento", "A", "C"...)
    pub fn from_source_text(text: &str) -> Option<Self> {
        let normalized = normalize_string(text);
        match normalized.as_str() {
            "" => None,
            "c" => Some(ProcessStatus::Completed),
            "a" => Some(ProcessStatus::InProgress),
            s if s.contains("conclu") || s.contains("finaliz") => Some(ProcessStatus::Completed),
            s if s.contains("andamento") => Some(ProcessStatus::InProgress),
            s if s.contains("pendente") || s.contains("nao iniciado") => Some(ProcessStatus::Pending),
            _ => None,
        }
    }

    /// Deriva a situação pelas contagens quando o texto não ajuda
    pub fn from_counts(done: i64, total: i64) -> Self {
        if total > 0 && done >= total {
            ProcessStatus::Completed
        } else if done > 0 {
            ProcessStatus::InProgress
        } else {
            ProcessStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Pending => "PENDING",
            ProcessStatus::InProgress => "IN_PROGRESS",
            ProcessStatus::Completed => "COMPLETED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProcessStatus::Pending => "Pendente",
            ProcessStatus::InProgress => "Em andamento",
            ProcessStatus::Completed => "Concluído",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    Atomic,
    SubProcess,
    BranchQuestion,
}

impl StepKind {
    /// "Sub processo" / "Subprocesso" / "Desdobramento" / qualquer outro
    pub fn from_source_text(text: Option<&str>) -> Self {
        let normalized = text.map(normalize_string).unwrap_or_default();
        if normalized.replace(' ', "") == "subprocesso" {
            StepKind::SubProcess
        } else if normalized.starts_with("desdobramento") {
            StepKind::BranchQuestion
        } else {
            StepKind::Atomic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Atomic => "ATOMIC",
            StepKind::SubProcess => "SUB_PROCESS",
            StepKind::BranchQuestion => "BRANCH_QUESTION",
        }
    }
}

/// Referência à empresa dona do processo (resolvida pelo código derivado)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRef {
    /// `{regime}_{primeiros 50 caracteres do nome}`
    pub code: String,
    pub name: String,
    pub tax_id: Option<String>,
    pub external_id: Option<i64>,
    pub tax_regime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessHeader {
    pub external_id: i64,
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
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatStep {
    /// Ordem de execução, a partir de 1, contínua entre sub processos
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatQuestion {
    pub ordinal: i64,
    /// Referência solta ao passo (não é FK)
    pub step_ordinal: i64,
    pub step_external_id: Option<i64>,
    pub question: String,
    pub status: Option<String>,
    pub choices: Vec<String>,
    pub selected_answer: Option<String>,
    pub action_kind: Option<String>,
    pub action_name: Option<String>,
    pub answered: bool,
}

/// Resultado do achatamento de um processo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatProcess {
    pub header: ProcessHeader,
    pub company: CompanyRef,
    pub steps: Vec<FlatStep>,
    pub questions: Vec<FlatQuestion>,
}

/// Hash de conteúdo: apenas situação, percentual e contagens de passos.
///
/// Metadados (gestor, departamento, datas) ficam de fora para não
/// regravar os filhos a cada sincronização.
pub fn content_hash(status: ProcessStatus, completion_pct: f64, done_steps: i64, total_steps: i64) -> String {
    let canonical = format!(
        "status={}|percentage={:.2}|done={}|total={}",
        status.as_str(),
        completion_pct,
        done_steps,
        total_steps
    );
    hex::encode(Sha256::digest(canonical.as_bytes()))
}
