//! Relatórios do menu do WhatsApp lidos do banco local

use mensageria::{
    Bottleneck, CompanyMatch, CompanyProcess, GeneralSummary, PendingQuestion, ProcessAlert,
    RegimeSummary, ReportResult, ReportSource,
};

use crate::services::store::Store;
use crate::utils::normalization::{digits_only, normalize_string};

/// Mínimo de dígitos para tratar o termo como CNPJ
const MIN_TAX_ID_DIGITS: usize = 3;

type AlertRow = (String, Option<String>, String, f64, i64, Option<String>);

fn to_alert((company, tax_id, regime, completion_pct, elapsed_days, waiting_on): AlertRow) -> ProcessAlert {
    ProcessAlert {
        company,
        tax_id,
        regime,
        completion_pct,
        elapsed_days,
        waiting_on,
    }
}

const ALERT_SELECT: &str = "SELECT c.name, c.tax_id, p.tax_regime, p.completion_pct, p.elapsed_days,
        (SELECT q.question FROM branch_questions q
          WHERE q.process_id = p.id AND q.answered = 0
          ORDER BY q.ordinal LIMIT 1) AS waiting_on
     FROM processes p
     JOIN companies c ON c.id = p.company_id";

impl ReportSource for Store {
    async fn general_summary(&self, competence: &str) -> ReportResult<GeneralSummary> {
        #[allow(clippy::type_complexity)]
        let row: (i64, i64, i64, i64, i64, f64, f64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(DISTINCT company_id),
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'COMPLETED' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'IN_PROGRESS' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN completion_pct = 0 AND status != 'COMPLETED' THEN 1 ELSE 0 END), 0),
                    CAST(COALESCE(AVG(completion_pct), 0.0) AS REAL),
                    CAST(COALESCE(AVG(elapsed_days), 0.0) AS REAL),
                    COALESCE(MIN(elapsed_days), 0),
                    COALESCE(MAX(elapsed_days), 0),
                    COALESCE(SUM(total_steps), 0),
                    COALESCE(SUM(done_steps), 0)
             FROM processes
             WHERE competence = ?",
        )
        .bind(competence)
        .fetch_one(self.pool())
        .await?;

        let (total_questions, answered_questions): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN q.answered = 1 THEN 1 ELSE 0 END), 0)
             FROM branch_questions q
             JOIN processes p ON p.id = q.process_id
             WHERE p.competence = ?",
        )
        .bind(competence)
        .fetch_one(self.pool())
        .await?;

        Ok(GeneralSummary {
            total_companies: row.0,
            total_processes: row.1,
            completed: row.2,
            in_progress: row.3,
            stalled: row.4,
            avg_progress: row.5,
            avg_days: row.6,
            min_days: row.7,
            max_days: row.8,
            total_steps: row.9,
            done_steps: row.10,
            total_questions,
            answered_questions,
        })
    }

    async fn regime_summaries(&self, competence: &str) -> ReportResult<Vec<RegimeSummary>> {
        Ok(self
            .regime_aggregates(competence)
            .await?
            .into_iter()
            .map(|a| RegimeSummary {
                regime: a.tax_regime,
                total: a.total,
                completed: a.completed,
                avg_progress: a.avg_progress,
                avg_days: a.avg_days,
            })
            .collect())
    }

    async fn late_processes(&self, competence: &str, limit: usize) -> ReportResult<Vec<ProcessAlert>> {
        let sql = format!(
            "{} WHERE p.competence = ? AND p.status != 'COMPLETED'
             ORDER BY p.elapsed_days DESC, p.completion_pct ASC LIMIT ?",
            ALERT_SELECT
        );
        let rows: Vec<AlertRow> = sqlx::query_as(&sql)
            .bind(competence)
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(to_alert).collect())
    }

    async fn stalled_processes(&self, competence: &str, limit: usize) -> ReportResult<Vec<ProcessAlert>> {
        let sql = format!(
            "{} WHERE p.competence = ? AND p.status != 'COMPLETED' AND p.completion_pct = 0
             ORDER BY p.elapsed_days DESC, c.name LIMIT ?",
            ALERT_SELECT
        );
        let rows: Vec<AlertRow> = sqlx::query_as(&sql)
            .bind(competence)
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(to_alert).collect())
    }

    async fn bottlenecks(&self, competence: &str, limit: usize) -> ReportResult<Vec<Bottleneck>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT s.name, COUNT(*) AS pending
             FROM steps s
             JOIN processes p ON p.id = s.process_id
             WHERE p.competence = ? AND s.done = 0 AND s.kind = 'ATOMIC'
             GROUP BY s.name
             ORDER BY pending DESC, s.name
             LIMIT ?",
        )
        .bind(competence)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(step_name, pending)| Bottleneck { step_name, pending })
            .collect())
    }

    async fn pending_questions(&self, competence: &str, limit: usize) -> ReportResult<Vec<PendingQuestion>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT q.question, COUNT(*) AS pending
             FROM branch_questions q
             JOIN processes p ON p.id = q.process_id
             WHERE p.competence = ? AND q.answered = 0
             GROUP BY q.question
             ORDER BY pending DESC, q.question
             LIMIT ?",
        )
        .bind(competence)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(question, pending)| PendingQuestion { question, pending })
            .collect())
    }

    async fn search_companies(&self, term: &str, limit: usize) -> ReportResult<Vec<CompanyMatch>> {
        let digits = digits_only(term);
        let by_tax_id = digits.len() >= MIN_TAX_ID_DIGITS && !term.chars().any(char::is_alphabetic);
        let needle = normalize_string(term);
        if !by_tax_id && needle.is_empty() {
            return Ok(Vec::new());
        }

        let companies: Vec<(i64, String, Option<String>, Option<String>)> =
            sqlx::query_as("SELECT id, name, tax_id, tax_regime FROM companies ORDER BY name")
                .fetch_all(self.pool())
                .await?;

        let mut matches = Vec::new();
        for (id, name, tax_id, regime) in companies {
            let hit = if by_tax_id {
                tax_id
                    .as_deref()
                    .map(|t| digits_only(t).contains(&digits))
                    .unwrap_or(false)
            } else {
                normalize_string(&name).contains(&needle)
            };
            if !hit {
                continue;
            }

            let processes = self
                .processes_for_company(id)
                .await?
                .into_iter()
                .map(|p| CompanyProcess {
                    external_id: p.external_id,
                    name: p.name,
                    competence: p.competence,
                    status: p.status.label().to_string(),
                    completion_pct: p.completion_pct,
                    elapsed_days: p.elapsed_days,
                })
                .collect();

            matches.push(CompanyMatch {
                name,
                tax_id,
                regime,
                processes,
            });
            if matches.len() >= limit {
                break;
            }
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::flatten::tests::{process_501, record, CTX};
    use crate::services::flatten::flatten_process;
    use crate::services::reconciler::reconcile;
    use serde_json::json;

    async fn seeded() -> Store {
        let store = Store::in_memory().await.unwrap();
        reconcile(&store, &flatten_process(&process_501(2, "50"), CTX).unwrap())
            .await
            .unwrap();

        let stalled = record(json!({
            "ProcID": 777,
            "ProcStatus": "Em andamento",
            "ProcPorcentagem": 0,
            "ProcCompetencia": "10/2025",
            "ProcDiasCorridos": 20,
            "EmpNome": "Açougue São Jorge",
            "EmpCNPJ": "98.765.432/0001-10",
            "ProcPassos": [
                {"Tipo": "Passo", "Nome": "Passo 1"},
                {"Tipo": "Desdobramento", "Nome": "Houve faturamento?", "Automacao": [{"Nome": "Sim"}, {"Nome": "Não"}]}
            ]
        }));
        reconcile(&store, &flatten_process(&stalled, CTX).unwrap()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_general_summary() {
        let store = seeded().await;
        let summary = store.general_summary("10/2025").await.unwrap();

        assert_eq!(summary.total_companies, 2);
        assert_eq!(summary.total_processes, 2);
        assert_eq!(summary.in_progress, 2);
        assert_eq!(summary.stalled, 1);
        assert_eq!(summary.avg_progress, 25.0);
        assert_eq!(summary.max_days, 20);
        assert_eq!(summary.total_steps, 6);
        assert_eq!(summary.done_steps, 2);
        assert_eq!(summary.total_questions, 1);
        assert_eq!(summary.answered_questions, 0);

        let empty = store.general_summary("01/2020").await.unwrap();
        assert_eq!(empty, GeneralSummary::default());
    }

    #[tokio::test]
    async fn test_alerts_and_rankings() {
        let store = seeded().await;

        let late = store.late_processes("10/2025", 10).await.unwrap();
        assert_eq!(late.len(), 2);
        assert_eq!(late[0].company, "Açougue São Jorge");
        assert_eq!(late[0].waiting_on.as_deref(), Some("Houve faturamento?"));

        let stalled = store.stalled_processes("10/2025", 10).await.unwrap();
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].elapsed_days, 20);

        let bottlenecks = store.bottlenecks("10/2025", 3).await.unwrap();
        assert_eq!(bottlenecks[0], Bottleneck { step_name: "Passo 1".into(), pending: 1 });
        assert!(bottlenecks.iter().any(|b| b.step_name == "Passo 3" && b.pending == 1));
        assert_eq!(bottlenecks.len(), 3);

        let questions = store.pending_questions("10/2025", 10).await.unwrap();
        assert_eq!(
            questions,
            vec![PendingQuestion { question: "Houve faturamento?".into(), pending: 1 }]
        );
    }

    #[tokio::test]
    async fn test_search_companies() {
        let store = seeded().await;

        let by_name = store.search_companies("acougue sao", 5).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].processes.len(), 1);
        assert_eq!(by_name[0].processes[0].external_id, 777);

        let by_tax_id = store.search_companies("12.345.678", 5).await.unwrap();
        assert_eq!(by_tax_id.len(), 1);
        assert_eq!(by_tax_id[0].name, "Padaria Central Ltda");

        assert!(store.search_companies("inexistente", 5).await.unwrap().is_empty());
        assert!(store.search_companies("!!", 5).await.unwrap().is_empty());
    }
}
