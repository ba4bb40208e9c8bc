//! Reconciliação por hash de conteúdo
//!
//! Um registro achatado por vez, em uma transação própria:
//! empresa (código derivado) → processo (external_id) → insere, atualiza
//! substituindo todos os filhos, ou não faz nada quando o hash é o mesmo.

use chrono::Utc;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{Sqlite, Transaction};
use std::collections::BTreeSet;

use crate::models::{CompanyRef, FlatProcess};
use crate::services::store::Store;
use crate::utils::logging::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconcileOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Contadores acumulados de uma execução
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub seen: i64,
    pub inserted: i64,
    pub updated: i64,
    pub unchanged: i64,
    pub failed: i64,
}

impl RunCounters {
    pub fn record(&mut self, outcome: ReconcileOutcome) {
        self.seen += 1;
        match outcome {
            ReconcileOutcome::Inserted => self.inserted += 1,
            ReconcileOutcome::Updated => self.updated += 1,
            ReconcileOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn record_failure(&mut self) {
        self.seen += 1;
        self.failed += 1;
    }
}

/// Grava um processo achatado (transação por registro)
pub async fn reconcile(store: &Store, flat: &FlatProcess) -> Result<ReconcileOutcome, sqlx::Error> {
    let mut tx = store.pool().begin().await?;

    let company_id = resolve_company(&mut tx, &flat.company).await?;

    let existing: Option<(i64, String)> =
        sqlx::query_as("SELECT id, content_hash FROM processes WHERE external_id = ?")
            .bind(flat.header.external_id)
            .fetch_optional(&mut *tx)
            .await?;

    let outcome = match existing {
        None => {
            let process_id = insert_header(&mut tx, flat, company_id).await?;
            insert_children(&mut tx, process_id, flat).await?;
            ReconcileOutcome::Inserted
        }
        Some((_, ref stored_hash)) if *stored_hash == flat.header.content_hash => {
            ReconcileOutcome::Unchanged
        }
        Some((process_id, _)) => {
            update_header(&mut tx, process_id, flat, company_id).await?;
            sqlx::query("DELETE FROM steps WHERE process_id = ?")
                .bind(process_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM branch_questions WHERE process_id = ?")
                .bind(process_id)
                .execute(&mut *tx)
                .await?;
            insert_children(&mut tx, process_id, flat).await?;
            ReconcileOutcome::Updated
        }
    };

    tx.commit().await?;
    Ok(outcome)
}

/// Reconcilia um lote; falhas de um registro são logadas e contadas
///
/// Devolve as competências com processos inseridos ou alterados.
pub async fn reconcile_batch(
    store: &Store,
    batch: &[FlatProcess],
    counters: &mut RunCounters,
) -> BTreeSet<String> {
    let mut touched = BTreeSet::new();
    for flat in batch {
        match reconcile(store, flat).await {
            Ok(outcome) => {
                if outcome != ReconcileOutcome::Unchanged {
                    touched.insert(flat.header.competence.clone());
                }
                counters.record(outcome);
            }
            Err(e) => {
                log_record_failed(flat.header.external_id, &e.to_string());
                counters.record_failure();
            }
        }
    }
    touched
}

async fn resolve_company(tx: &mut Transaction<'_, Sqlite>, company: &CompanyRef) -> Result<i64, sqlx::Error> {
    let existing: Option<(i64, String, Option<String>, Option<i64>)> = sqlx::query_as(
        "SELECT id, name, tax_id, external_id FROM companies WHERE code = ?",
    )
    .bind(&company.code)
    .fetch_optional(&mut **tx)
    .await?;

    let now = Utc::now();

    match existing {
        None => {
            let result = sqlx::query(
                "INSERT INTO companies (code, name, tax_id, external_id, tax_regime, active, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
            )
            .bind(&company.code)
            .bind(&company.name)
            .bind(&company.tax_id)
            .bind(company.external_id)
            .bind(&company.tax_regime)
            .bind(now)
            .bind(now)
            .execute(&mut **tx)
            .await?;
            Ok(result.last_insert_rowid())
        }
        Some((id, name, tax_id, external_id)) => {
            if let (Some(stored), Some(incoming)) = (external_id, company.external_id) {
                if stored != incoming {
                    log_warning(&format!(
                        "⚠️ Colisão de código de empresa '{}': EmpID gravado {} difere do recebido {}",
                        company.code, stored, incoming
                    ));
                }
            }

            let tax_id_missing = tax_id.is_none() && company.tax_id.is_some();
            let external_missing = external_id.is_none() && company.external_id.is_some();

            if name != company.name || tax_id_missing || external_missing {
                sqlx::query(
                    "UPDATE companies
                     SET name = ?, tax_id = COALESCE(tax_id, ?), external_id = COALESCE(external_id, ?), updated_at = ?
                     WHERE id = ?",
                )
                .bind(&company.name)
                .bind(&company.tax_id)
                .bind(company.external_id)
                .bind(now)
                .bind(id)
                .execute(&mut **tx)
                .await?;
            }
            Ok(id)
        }
    }
}

async fn insert_header(
    tx: &mut Transaction<'_, Sqlite>,
    flat: &FlatProcess,
    company_id: i64,
) -> Result<i64, sqlx::Error> {
    let h = &flat.header;
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO processes (
            external_id, company_id, name, title, competence, status, completion_pct,
            total_steps, done_steps, elapsed_days, started_on, finished_on, tax_regime,
            manager, department, content_hash, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(h.external_id)
    .bind(company_id)
    .bind(&h.name)
    .bind(&h.title)
    .bind(&h.competence)
    .bind(h.status)
    .bind(h.completion_pct)
    .bind(h.total_steps)
    .bind(h.done_steps)
    .bind(h.elapsed_days)
    .bind(h.started_on)
    .bind(h.finished_on)
    .bind(&h.tax_regime)
    .bind(&h.manager)
    .bind(&h.department)
    .bind(&h.content_hash)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

async fn update_header(
    tx: &mut Transaction<'_, Sqlite>,
    process_id: i64,
    flat: &FlatProcess,
    company_id: i64,
) -> Result<(), sqlx::Error> {
    let h = &flat.header;

    sqlx::query(
        "UPDATE processes SET
            company_id = ?, name = ?, title = ?, competence = ?, status = ?, completion_pct = ?,
            total_steps = ?, done_steps = ?, elapsed_days = ?, started_on = ?, finished_on = ?,
            tax_regime = ?, manager = ?, department = ?, content_hash = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(company_id)
    .bind(&h.name)
    .bind(&h.title)
    .bind(&h.competence)
    .bind(h.status)
    .bind(h.completion_pct)
    .bind(h.total_steps)
    .bind(h.done_steps)
    .bind(h.elapsed_days)
    .bind(h.started_on)
    .bind(h.finished_on)
    .bind(&h.tax_regime)
    .bind(&h.manager)
    .bind(&h.department)
    .bind(&h.content_hash)
    .bind(Utc::now())
    .bind(process_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_children(
    tx: &mut Transaction<'_, Sqlite>,
    process_id: i64,
    flat: &FlatProcess,
) -> Result<(), sqlx::Error> {
    for step in &flat.steps {
        sqlx::query(
            "INSERT INTO steps (
                process_id, ordinal, external_id, kind, raw_kind, name, status, done,
                description, owner, blocking, delivery_kind, delivery_name, deadline
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(process_id)
        .bind(step.ordinal)
        .bind(step.external_id)
        .bind(step.kind)
        .bind(&step.raw_kind)
        .bind(&step.name)
        .bind(&step.status)
        .bind(step.done)
        .bind(&step.description)
        .bind(&step.owner)
        .bind(step.blocking)
        .bind(&step.delivery_kind)
        .bind(&step.delivery_name)
        .bind(&step.deadline)
        .execute(&mut **tx)
        .await?;
    }

    for question in &flat.questions {
        sqlx::query(
            "INSERT INTO branch_questions (
                process_id, ordinal, step_ordinal, step_external_id, question, status, choices,
                selected_answer, action_kind, action_name, answered
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(process_id)
        .bind(question.ordinal)
        .bind(question.step_ordinal)
        .bind(question.step_external_id)
        .bind(&question.question)
        .bind(&question.status)
        .bind(Json(&question.choices))
        .bind(&question.selected_answer)
        .bind(&question.action_kind)
        .bind(&question.action_name)
        .bind(question.answered)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::flatten::tests::{process_501, record, CTX};
    use crate::services::flatten::flatten_process;
    use serde_json::json;

    fn with_question(percentage: &str) -> FlatProcess {
        flatten_process(
            &record(json!({
                "ProcID": 900,
                "ProcStatus": "Em andamento",
                "ProcPorcentagem": percentage,
                "EmpNome": "Mercado Bom Preço",
                "ProcPassos": [
                    {"Tipo": "Passo", "Nome": "Importar notas", "Status": "OK"},
                    {"Tipo": "Desdobramento", "Nome": "Teve retenção?", "Status": "Pendente",
                     "Automacao": [{"Nome": "Sim"}, {"Nome": "Não"}]}
                ]
            })),
            CTX,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_unchanged() {
        let store = Store::in_memory().await.unwrap();
        let flat = with_question("50");

        assert_eq!(reconcile(&store, &flat).await.unwrap(), ReconcileOutcome::Inserted);
        let before = store.table_counts().await.unwrap();
        assert_eq!(before.companies, 1);
        assert_eq!(before.processes, 1);
        assert_eq!(before.steps, 2);
        assert_eq!(before.branch_questions, 1);

        assert_eq!(reconcile(&store, &flat).await.unwrap(), ReconcileOutcome::Unchanged);
        assert_eq!(store.table_counts().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_percentage_change_updates_header_and_keeps_questions() {
        let store = Store::in_memory().await.unwrap();
        reconcile(&store, &with_question("50")).await.unwrap();
        let before = store.table_counts().await.unwrap();

        let outcome = reconcile(&store, &with_question("60")).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Updated);

        let after = store.table_counts().await.unwrap();
        assert_eq!(after.branch_questions, before.branch_questions);
        assert_eq!(after.steps, before.steps);

        let process = store.find_process_by_external_id(900).await.unwrap().unwrap();
        assert_eq!(process.completion_pct, 60.0);

        let detail = store.process_detail(process.id).await.unwrap().unwrap();
        assert_eq!(detail.branch_questions[0].choices.0, vec!["Sim".to_string(), "Não".to_string()]);
    }

    #[tokio::test]
    async fn test_example_501_second_sync_updates() {
        let store = Store::in_memory().await.unwrap();
        let mut counters = RunCounters::default();

        let first = flatten_process(&process_501(2, "50"), CTX).unwrap();
        let touched = reconcile_batch(&store, &[first.clone()], &mut counters).await;
        assert_eq!(counters.inserted, 1);
        assert!(touched.contains(&first.header.competence));

        let again = reconcile_batch(&store, &[first], &mut counters).await;
        assert_eq!(counters.unchanged, 1);
        assert!(again.is_empty());

        let mut second_run = RunCounters::default();
        let second = flatten_process(&process_501(3, "75"), CTX).unwrap();
        reconcile_batch(&store, &[second], &mut second_run).await;
        assert_eq!(second_run.updated, 1);
        assert_eq!(second_run.inserted, 0);

        let process = store.find_process_by_external_id(501).await.unwrap().unwrap();
        assert_eq!(process.done_steps, 3);
        assert_eq!(process.total_steps, 4);

        let detail = store.process_detail(process.id).await.unwrap().unwrap();
        assert_eq!(detail.steps.len(), 4);
        assert_eq!(detail.steps.iter().filter(|s| s.done).count(), 3);
    }

    #[tokio::test]
    async fn test_company_name_update_and_backfill() {
        let store = Store::in_memory().await.unwrap();
        let mut flat = flatten_process(&process_501(2, "50"), CTX).unwrap();
        flat.company.tax_id = None;
        flat.company.external_id = None;
        reconcile(&store, &flat).await.unwrap();

        let mut again = flatten_process(&process_501(2, "50"), CTX).unwrap();
        again.company.name = "Padaria Central Ltda.".into();
        reconcile(&store, &again).await.unwrap();

        let companies = store.list_companies(0, 10).await.unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].name, "Padaria Central Ltda.");
        assert_eq!(companies[0].tax_id.as_deref(), Some("12.345.678/0001-90"));
        assert_eq!(companies[0].external_id, Some(77));
    }

    #[test]
    fn test_counters() {
        let mut counters = RunCounters::default();
        counters.record(ReconcileOutcome::Inserted);
        counters.record(ReconcileOutcome::Unchanged);
        counters.record_failure();
        assert_eq!(counters.seen, 3);
        assert_eq!(counters.inserted, 1);
        assert_eq!(counters.unchanged, 1);
        assert_eq!(counters.failed, 1);
    }
}
