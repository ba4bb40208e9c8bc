//! Banco local (SQLite via sqlx)
//!
//! Leituras usadas pela API, dashboard, planilhas e menu do WhatsApp, além do
//! ciclo de vida das execuções de sincronização. A escrita de processos fica
//! no reconciliador, dentro de uma transação por registro.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use std::str::FromStr;

use crate::models::{
    CompanyRow, ProcessDetail, ProcessRow, ProcessStatus, QuestionRow, RegimeAggregate, StepRow,
    SyncKind, SyncRunRow, SyncStatus, TableCounts,
};
use crate::utils::logging::*;

const SCHEMA_SQL: &str = include_str!("../../migrations/001_schema.sql");

pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 500;

/// Filtros da listagem de processos
#[derive(Debug, Clone, Default)]
pub struct ProcessFilter {
    pub competence: Option<String>,
    pub regime: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

impl ProcessFilter {
    /// Limite padrão 100, máximo 500, skip nunca negativo
    pub fn clamped(mut self) -> Self {
        if self.limit <= 0 {
            self.limit = DEFAULT_PAGE_LIMIT;
        }
        self.limit = self.limit.min(MAX_PAGE_LIMIT);
        self.skip = self.skip.max(0);
        self
    }
}

/// Situação e percentual gravados, para o filtro da sincronização incremental
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fingerprint {
    pub status: ProcessStatus,
    pub completion_pct: f64,
}

/// Linha da aba PROCESSOS_GERAL
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProcessSheetRow {
    pub external_id: i64,
    pub company_name: String,
    pub tax_id: Option<String>,
    pub name: String,
    pub competence: String,
    pub status: ProcessStatus,
    pub completion_pct: f64,
    pub total_steps: i64,
    pub done_steps: i64,
    pub elapsed_days: i64,
    pub manager: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Linha da aba PROCESSOS_PASSOS
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StepSheetRow {
    pub process_external_id: i64,
    pub company_name: String,
    pub ordinal: i64,
    pub kind: String,
    pub name: String,
    pub status: Option<String>,
    pub done: bool,
    pub owner: Option<String>,
    pub deadline: Option<String>,
}

/// Linha da aba PROCESSOS_DESDOBRAMENTOS
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuestionSheetRow {
    pub process_external_id: i64,
    pub company_name: String,
    pub step_ordinal: i64,
    pub question: String,
    pub selected_answer: Option<String>,
    pub action_kind: Option<String>,
    pub action_name: Option<String>,
    pub answered: bool,
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Conecta ao arquivo SQLite (criado se não existir) e aplica o schema
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        if let Some(parent) = sqlite_file_path(url).and_then(|p| p.parent().map(|d| d.to_path_buf())) {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(&parent).await?;
            }
        }

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        log_info(&format!("✅ Banco conectado: {}", url));
        Ok(store)
    }

    /// Banco em memória com uma única conexão (testes e execuções descartáveis)
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Aplica `migrations/001_schema.sql` (idempotente: CREATE ... IF NOT EXISTS)
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        for statement in split_sql_statements(SCHEMA_SQL) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Processos e empresas
    // ------------------------------------------------------------------

    pub async fn list_processes(&self, filter: &ProcessFilter) -> Result<Vec<ProcessRow>, sqlx::Error> {
        let filter = filter.clone().clamped();
        sqlx::query_as::<_, ProcessRow>(
            "SELECT * FROM processes
             WHERE (? IS NULL OR competence = ?)
               AND (? IS NULL OR tax_regime = ?)
             ORDER BY id
             LIMIT ? OFFSET ?",
        )
        .bind(&filter.competence)
        .bind(&filter.competence)
        .bind(&filter.regime)
        .bind(&filter.regime)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_process(&self, id: i64) -> Result<Option<ProcessRow>, sqlx::Error> {
        sqlx::query_as::<_, ProcessRow>("SELECT * FROM processes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_process_by_external_id(&self, external_id: i64) -> Result<Option<ProcessRow>, sqlx::Error> {
        sqlx::query_as::<_, ProcessRow>("SELECT * FROM processes WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Processo com empresa, passos (por ordinal) e desdobramentos
    pub async fn process_detail(&self, id: i64) -> Result<Option<ProcessDetail>, sqlx::Error> {
        let Some(process) = self.get_process(id).await? else {
            return Ok(None);
        };

        let company = sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies WHERE id = ?")
            .bind(process.company_id)
            .fetch_one(&self.pool)
            .await?;

        let steps = sqlx::query_as::<_, StepRow>(
            "SELECT * FROM steps WHERE process_id = ? ORDER BY ordinal",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let branch_questions = sqlx::query_as::<_, QuestionRow>(
            "SELECT * FROM branch_questions WHERE process_id = ? ORDER BY ordinal",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ProcessDetail {
            process,
            company,
            steps,
            branch_questions,
        }))
    }

    /// external_id → (situação, percentual) de todos os processos gravados
    pub async fn process_fingerprints(&self) -> Result<HashMap<i64, Fingerprint>, sqlx::Error> {
        let rows: Vec<(i64, ProcessStatus, f64)> =
            sqlx::query_as("SELECT external_id, status, completion_pct FROM processes")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(external_id, status, completion_pct)| {
                (external_id, Fingerprint { status, completion_pct })
            })
            .collect())
    }

    pub async fn list_companies(&self, skip: i64, limit: i64) -> Result<Vec<CompanyRow>, sqlx::Error> {
        let page = ProcessFilter { skip, limit, ..Default::default() }.clamped();
        sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies ORDER BY name LIMIT ? OFFSET ?")
            .bind(page.limit)
            .bind(page.skip)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_company(&self, id: i64) -> Result<Option<CompanyRow>, sqlx::Error> {
        sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn processes_for_company(&self, company_id: i64) -> Result<Vec<ProcessRow>, sqlx::Error> {
        sqlx::query_as::<_, ProcessRow>(
            "SELECT * FROM processes WHERE company_id = ? ORDER BY competence DESC, id",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_processes(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM processes")
            .fetch_one(&self.pool)
            .await
    }

    pub async fn table_counts(&self) -> Result<TableCounts, sqlx::Error> {
        let (companies, processes, steps, branch_questions, sync_runs): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT
                    (SELECT COUNT(*) FROM companies),
                    (SELECT COUNT(*) FROM processes),
                    (SELECT COUNT(*) FROM steps),
                    (SELECT COUNT(*) FROM branch_questions),
                    (SELECT COUNT(*) FROM sync_runs)",
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(TableCounts {
            companies,
            processes,
            steps,
            branch_questions,
            sync_runs,
        })
    }

    // ------------------------------------------------------------------
    // Execuções de sincronização (append-only)
    // ------------------------------------------------------------------

    pub async fn start_sync_run(&self, kind: SyncKind, competence: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO sync_runs (kind, competence, status, started_at) VALUES (?, ?, ?, ?)",
        )
        .bind(kind)
        .bind(competence)
        .bind(SyncStatus::Started)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn finish_sync_run(
        &self,
        run_id: i64,
        total: i64,
        new: i64,
        updated: i64,
        unchanged: i64,
        failed: i64,
        elapsed_seconds: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE sync_runs
             SET status = ?, total_processes = ?, new_processes = ?, updated_processes = ?,
                 unchanged_processes = ?, failed_processes = ?, elapsed_seconds = ?, finished_at = ?
             WHERE id = ?",
        )
        .bind(SyncStatus::Completed)
        .bind(total)
        .bind(new)
        .bind(updated)
        .bind(unchanged)
        .bind(failed)
        .bind(elapsed_seconds)
        .bind(Utc::now())
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Finaliza com ERROR, mantendo as contagens parciais
    #[allow(clippy::too_many_arguments)]
    pub async fn fail_sync_run(
        &self,
        run_id: i64,
        total: i64,
        new: i64,
        updated: i64,
        unchanged: i64,
        failed: i64,
        elapsed_seconds: i64,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE sync_runs
             SET status = ?, total_processes = ?, new_processes = ?, updated_processes = ?,
                 unchanged_processes = ?, failed_processes = ?, elapsed_seconds = ?,
                 error_message = ?, finished_at = ?
             WHERE id = ?",
        )
        .bind(SyncStatus::Error)
        .bind(total)
        .bind(new)
        .bind(updated)
        .bind(unchanged)
        .bind(failed)
        .bind(elapsed_seconds)
        .bind(message)
        .bind(Utc::now())
        .bind(run_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn latest_sync_run(&self) -> Result<Option<SyncRunRow>, sqlx::Error> {
        sqlx::query_as::<_, SyncRunRow>("SELECT * FROM sync_runs ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn sync_history(&self, limit: i64) -> Result<Vec<SyncRunRow>, sqlx::Error> {
        sqlx::query_as::<_, SyncRunRow>("SELECT * FROM sync_runs ORDER BY id DESC LIMIT ?")
            .bind(limit.clamp(1, MAX_PAGE_LIMIT))
            .fetch_all(&self.pool)
            .await
    }

    // ------------------------------------------------------------------
    // Agregados do dashboard
    // ------------------------------------------------------------------

    pub async fn regime_aggregates(&self, competence: &str) -> Result<Vec<RegimeAggregate>, sqlx::Error> {
        sqlx::query_as::<_, RegimeAggregate>(
            "SELECT tax_regime,
                    COUNT(*) AS total,
                    COALESCE(SUM(CASE WHEN status = 'COMPLETED' THEN 1 ELSE 0 END), 0) AS completed,
                    CAST(COALESCE(AVG(elapsed_days), 0.0) AS REAL) AS avg_days,
                    CAST(COALESCE(AVG(completion_pct), 0.0) AS REAL) AS avg_progress
             FROM processes
             WHERE competence = ?
             GROUP BY tax_regime
             ORDER BY tax_regime",
        )
        .bind(competence)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_companies_in(&self, competence: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(DISTINCT company_id) FROM processes WHERE competence = ?")
            .bind(competence)
            .fetch_one(&self.pool)
            .await
    }

    // ------------------------------------------------------------------
    // Planilhas
    // ------------------------------------------------------------------

    pub async fn regimes(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT DISTINCT tax_regime FROM processes ORDER BY tax_regime")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn process_sheet(&self, regime: &str) -> Result<Vec<ProcessSheetRow>, sqlx::Error> {
        sqlx::query_as::<_, ProcessSheetRow>(
            "SELECT p.external_id, c.name AS company_name, c.tax_id, p.name, p.competence,
                    p.status, p.completion_pct, p.total_steps, p.done_steps, p.elapsed_days,
                    p.manager, p.updated_at
             FROM processes p
             JOIN companies c ON c.id = p.company_id
             WHERE p.tax_regime = ?
             ORDER BY c.name, p.competence",
        )
        .bind(regime)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn step_sheet(&self, regime: &str) -> Result<Vec<StepSheetRow>, sqlx::Error> {
        sqlx::query_as::<_, StepSheetRow>(
            "SELECT p.external_id AS process_external_id, c.name AS company_name, s.ordinal,
                    s.kind, s.name, s.status, s.done, s.owner, s.deadline
             FROM steps s
             JOIN processes p ON p.id = s.process_id
             JOIN companies c ON c.id = p.company_id
             WHERE p.tax_regime = ?
             ORDER BY c.name, p.external_id, s.ordinal",
        )
        .bind(regime)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn question_sheet(&self, regime: &str) -> Result<Vec<QuestionSheetRow>, sqlx::Error> {
        sqlx::query_as::<_, QuestionSheetRow>(
            "SELECT p.external_id AS process_external_id, c.name AS company_name, q.step_ordinal,
                    q.question, q.selected_answer, q.action_kind, q.action_name, q.answered
             FROM branch_questions q
             JOIN processes p ON p.id = q.process_id
             JOIN companies c ON c.id = p.company_id
             WHERE p.tax_regime = ?
             ORDER BY c.name, p.external_id, q.ordinal",
        )
        .bind(regime)
        .fetch_all(&self.pool)
        .await
    }
}

/// Caminho do arquivo de uma URL `sqlite://...` (None para memória)
fn sqlite_file_path(url: &str) -> Option<std::path::PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") {
        None
    } else {
        Some(std::path::PathBuf::from(path))
    }
}

/// Divide o schema em statements (comentários `--` de linha inteira ignorados)
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }

        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            statements.push(current.trim().to_string());
            current.clear();
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }

    statements
}
