//! Orquestração da sincronização (API Acessórias → banco local)
//!
//! 1. Abre uma linha em `sync_runs` (STARTED)
//! 2. Lista cada regime × filtro de status, sem repetir ProcID
//! 3. FULL busca o detalhe de todos; INCREMENTAL só dos novos ou com
//!    situação/percentual diferente do gravado
//! 4. Detalhes em lotes concorrentes com pausa entre lotes; cada lote é
//!    achatado e reconciliado antes do próximo
//! 5. Finaliza a linha (COMPLETED ou ERROR) e invalida o cache de métricas

use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use acessorias::{AcessoriasClient, AcessoriasError, ProcessQuery, ProcessRecord};

use crate::config::settings::SyncSettings;
use crate::models::{FlatProcess, ProcessStatus, SyncKind, SyncStatus};
use crate::services::flatten::{flatten_process, RegimeContext};
use crate::services::metrics::MetricsCache;
use crate::services::reconciler::{reconcile_batch, RunCounters};
use crate::services::store::{Fingerprint, Store};
use crate::utils::logging::*;
use crate::utils::normalization::normalize_competence;

/// Diferença de percentual abaixo disso é ruído de arredondamento
const PERCENTAGE_TOLERANCE: f64 = 0.005;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Acessórias: {0}")]
    Source(#[from] AcessoriasError),

    #[error("banco local: {0}")]
    Store(#[from] sqlx::Error),
}

/// Resumo de uma execução, devolvido à API e à CLI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub run_id: i64,
    pub kind: SyncKind,
    pub competence: String,
    pub status: SyncStatus,
    pub total_processes: i64,
    pub new_processes: i64,
    pub updated_processes: i64,
    pub unchanged_processes: i64,
    pub failed_processes: i64,
    /// Processos que o filtro incremental dispensou de buscar
    pub skipped_processes: i64,
    /// Detalhes buscados e processados (com ou sem sucesso)
    pub fetched_processes: i64,
    pub elapsed_seconds: i64,
}

/// Processo listado, com o regime de onde veio
#[derive(Debug, Clone)]
struct Candidate {
    id: i64,
    regime: String,
    listing: ProcessRecord,
}

#[derive(Debug, Default)]
struct RunProgress {
    listed: i64,
    skipped: i64,
    counters: RunCounters,
    touched: BTreeSet<String>,
}

pub struct SyncService {
    client: AcessoriasClient,
    store: Store,
    cache: MetricsCache,
    settings: SyncSettings,
}

impl SyncService {
    pub fn new(client: AcessoriasClient, store: Store, cache: MetricsCache, settings: SyncSettings) -> Self {
        Self {
            client,
            store,
            cache,
            settings,
        }
    }

    pub fn default_competence(&self) -> &str {
        &self.settings.default_competence
    }

    pub fn client(&self) -> &AcessoriasClient {
        &self.client
    }

    /// Executa uma sincronização completa ou incremental
    ///
    /// Erros fatais da API (token inválido) abortam a execução e ficam
    /// registrados em `sync_runs`; o que já foi gravado permanece.
    pub async fn run(&self, kind: SyncKind, competence: Option<&str>) -> Result<SyncReport, SyncError> {
        let competence = competence
            .and_then(normalize_competence)
            .unwrap_or_else(|| self.settings.default_competence.clone());

        let run_id = self.store.start_sync_run(kind, &competence).await?;
        log_sync_started(kind.as_str(), &competence, run_id);

        let started = Instant::now();
        let mut progress = RunProgress::default();
        let result = self.execute(kind, &competence, &mut progress).await;
        let elapsed = started.elapsed().as_secs() as i64;

        let counters = progress.counters;
        let unchanged = counters.unchanged + progress.skipped;

        self.invalidate_cache(&competence, &progress.touched).await;

        match result {
            Ok(()) => {
                self.store
                    .finish_sync_run(
                        run_id,
                        progress.listed,
                        counters.inserted,
                        counters.updated,
                        unchanged,
                        counters.failed,
                        elapsed,
                    )
                    .await?;

                log_sync_finished(
                    kind.as_str(),
                    run_id,
                    counters.inserted,
                    counters.updated,
                    unchanged,
                    counters.failed,
                    elapsed,
                );

                Ok(SyncReport {
                    run_id,
                    kind,
                    competence,
                    status: SyncStatus::Completed,
                    total_processes: progress.listed,
                    new_processes: counters.inserted,
                    updated_processes: counters.updated,
                    unchanged_processes: unchanged,
                    failed_processes: counters.failed,
                    skipped_processes: progress.skipped,
                    fetched_processes: counters.seen,
                    elapsed_seconds: elapsed,
                })
            }
            Err(e) => {
                let message = e.to_string();
                log_sync_failed(kind.as_str(), run_id, &message);

                if let Err(db_err) = self
                    .store
                    .fail_sync_run(
                        run_id,
                        progress.listed,
                        counters.inserted,
                        counters.updated,
                        unchanged,
                        counters.failed,
                        elapsed,
                        &message,
                    )
                    .await
                {
                    log_error(&format!("❌ Não foi possível registrar a falha da execução #{}: {}", run_id, db_err));
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, kind: SyncKind, competence: &str, progress: &mut RunProgress) -> Result<(), SyncError> {
        let listed = self.list_candidates().await?;
        progress.listed = listed.len() as i64;
        log_info(&format!("📋 {} processos listados na Acessórias", listed.len()));

        let to_fetch = match kind {
            SyncKind::Full => listed,
            SyncKind::Incremental => {
                let fingerprints = self.store.process_fingerprints().await?;
                let total = listed.len();
                let changed: Vec<Candidate> = listed
                    .into_iter()
                    .filter(|c| needs_fetch(&c.listing, fingerprints.get(&c.id)))
                    .collect();
                progress.skipped = (total - changed.len()) as i64;
                log_info(&format!(
                    "🔍 Incremental: {} novos/alterados, {} sem mudança na listagem",
                    changed.len(),
                    progress.skipped
                ));
                changed
            }
        };

        let batch_size = self.settings.batch_size.max(1);
        let batch_delay = Duration::from_millis(self.settings.batch_delay_ms);
        let batches: Vec<&[Candidate]> = to_fetch.chunks(batch_size).collect();
        let batch_count = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            let results = join_all(batch.iter().map(|c| self.client.detail(c.id))).await;

            let mut flats = Vec::with_capacity(batch.len());
            let mut fatal = None;
            for (candidate, result) in batch.iter().zip(results) {
                match result {
                    Ok(Some(detail)) => {
                        let detail = merge_listing(detail, &candidate.listing);
                        let counters = &mut progress.counters;
                        if let Some(flat) = flatten_candidate(candidate, &detail, competence, counters) {
                            flats.push(flat);
                        }
                    }
                    Ok(None) => {
                        log_record_failed(candidate.id, "detalhe indisponível");
                        progress.counters.record_failure();
                    }
                    Err(e) if e.is_fatal() => {
                        fatal = Some(e);
                        break;
                    }
                    Err(e) => {
                        log_record_failed(candidate.id, &e.to_string());
                        progress.counters.record_failure();
                    }
                }
            }

            // O que chegou antes de um erro fatal ainda é gravado
            let touched = reconcile_batch(&self.store, &flats, &mut progress.counters).await;
            progress.touched.extend(touched);
            if let Some(e) = fatal {
                return Err(e.into());
            }

            tracing::debug!(
                "⏳ Lote {}/{} processado ({} detalhes)",
                index + 1,
                batch_count,
                batch.len()
            );

            if index + 1 < batch_count && !batch_delay.is_zero() {
                tokio::time::sleep(batch_delay).await;
            }
        }

        Ok(())
    }

    /// Lista todos os regimes × status; o primeiro regime a listar um ProcID fica com ele
    async fn list_candidates(&self) -> Result<Vec<Candidate>, AcessoriasError> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for regime in &self.settings.regimes {
            for status in &self.settings.status_filters {
                let query = ProcessQuery::new()
                    .status(status.as_str())
                    .name(regime.process_name.as_str());

                for record in self.client.list_all(&query).await? {
                    let Some(id) = record.id else {
                        log_warning(&format!("⚠️ Processo sem ProcID na listagem de {}", regime.code));
                        continue;
                    };
                    if seen.insert(id) {
                        candidates.push(Candidate {
                            id,
                            regime: regime.code.clone(),
                            listing: record,
                        });
                    }
                }
            }
        }

        Ok(candidates)
    }

    async fn invalidate_cache(&self, competence: &str, touched: &BTreeSet<String>) {
        self.cache.invalidate(competence).await;
        for other in touched.iter().filter(|c| c.as_str() != competence) {
            self.cache.invalidate(other).await;
        }
    }

    /// Sincronização incremental periódica dentro do servidor (0 = desativada)
    pub fn spawn_periodic(self: Arc<Self>, interval_minutes: u64) -> Option<tokio::task::JoinHandle<()>> {
        if interval_minutes == 0 {
            return None;
        }

        let period = Duration::from_secs(interval_minutes * 60);
        log_info(&format!("⏰ Sincronização incremental agendada a cada {} min", interval_minutes));

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run(SyncKind::Incremental, None).await {
                    log_error(&format!("❌ Sincronização periódica falhou: {}", e));
                }
            }
        }))
    }
}

/// Decide, pela listagem, se o detalhe precisa ser buscado
///
/// Sem situação e sem percentual na listagem não há como comparar: busca.
fn needs_fetch(listing: &ProcessRecord, stored: Option<&Fingerprint>) -> bool {
    let Some(stored) = stored else {
        return true;
    };

    let status = listing.status.as_deref().and_then(ProcessStatus::from_source_text);
    let percentage = listing.percentage;

    if status.is_none() && percentage.is_none() {
        return true;
    }

    let status_changed = status.map(|s| s != stored.status).unwrap_or(false);
    let percentage_changed = percentage
        .map(|p| (p - stored.completion_pct).abs() > PERCENTAGE_TOLERANCE)
        .unwrap_or(false);

    status_changed || percentage_changed
}

/// Achata um detalhe; falha conta só para este registro
fn flatten_candidate(
    candidate: &Candidate,
    detail: &ProcessRecord,
    competence: &str,
    counters: &mut RunCounters,
) -> Option<FlatProcess> {
    let ctx = RegimeContext {
        regime: &candidate.regime,
        default_competence: competence,
    };

    match flatten_process(detail, ctx) {
        Ok(flat) => Some(flat),
        Err(e) => {
            log_record_failed(candidate.id, &e.to_string());
            counters.record_failure();
            None
        }
    }
}

/// Completa dados da empresa ausentes no detalhe com os da listagem
fn merge_listing(mut detail: ProcessRecord, listing: &ProcessRecord) -> ProcessRecord {
    if detail.id.is_none() {
        detail.id = listing.id;
    }
    if detail.company_name.is_none() {
        detail.company_name = listing.company_name.clone();
    }
    if detail.company_tax_id.is_none() {
        detail.company_tax_id = listing.company_tax_id.clone();
    }
    if detail.company_id.is_none() {
        detail.company_id = listing.company_id;
    }
    if detail.competence.is_none() {
        detail.competence = listing.competence.clone();
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::RegimeSettings;
    use acessorias::ClientOptions;
    use httpmock::prelude::*;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn regimes_by_id(candidates: &[Candidate]) -> HashMap<i64, String> {
        candidates.iter().map(|c| (c.id, c.regime.clone())).collect()
    }

    fn client(server: &MockServer) -> AcessoriasClient {
        AcessoriasClient::with_options(
            "test-token",
            ClientOptions {
                base_url: server.base_url(),
                max_requests_per_minute: 0,
                retry_cooldown: Duration::ZERO,
                page_delay: Duration::ZERO,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn settings(regimes: Vec<RegimeSettings>) -> SyncSettings {
        SyncSettings {
            batch_size: 2,
            batch_delay_ms: 0,
            default_competence: "10/2025".to_string(),
            status_filters: vec!["A".to_string()],
            regimes,
            interval_minutes: 0,
        }
    }

    async fn service(server: &MockServer, regimes: Vec<RegimeSettings>, cache_dir: &std::path::Path) -> SyncService {
        SyncService::new(
            client(server),
            Store::in_memory().await.unwrap(),
            MetricsCache::new(cache_dir, Duration::from_secs(900)),
            settings(regimes),
        )
    }

    fn detail(id: i64, done: usize, percentage: u32, competence: &str) -> Value {
        let steps: Vec<Value> = (1..=4)
            .map(|i| json!({"Tipo": "Passo", "Nome": format!("Passo {}", i), "Status": if i <= done { "OK" } else { "Pendente" }}))
            .collect();
        json!({
            "ProcID": id,
            "ProcStatus": "Em andamento",
            "ProcPorcentagem": percentage,
            "ProcCompetencia": competence,
            "EmpNome": format!("Empresa {} Ltda", id),
            "ProcPassos": steps
        })
    }

    fn detail_501(done: usize, percentage: u32) -> Value {
        let mut value = detail(501, done, percentage, "10/2025");
        value["EmpNome"] = json!("Padaria Central Ltda");
        value
    }

    fn cached_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    fn mock_listing<'a>(server: &'a MockServer, name: &str, items: Value) -> (httpmock::Mock<'a>, httpmock::Mock<'a>) {
        let page1 = server.mock(|when, then| {
            when.method(GET)
                .path("/processes/ListAll/")
                .query_param("Pagina", "1")
                .query_param("ProcNome", name);
            then.status(200).json_body(items);
        });
        let page2 = server.mock(|when, then| {
            when.method(GET)
                .path("/processes/ListAll/")
                .query_param("Pagina", "2")
                .query_param("ProcNome", name);
            then.status(200).json_body(json!([]));
        });
        (page1, page2)
    }

    #[tokio::test]
    async fn test_full_sync_then_idempotent() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        mock_listing(
            &server,
            "SimplesMensal",
            json!([{"ProcID": 501, "ProcStatus": "Em andamento", "ProcPorcentagem": "50%"}]),
        );
        let detail = server.mock(|when, then| {
            when.method(GET).path("/processes/501");
            then.status(200).json_body(detail_501(2, 50));
        });

        let sync = service(&server, vec![RegimeSettings::new("SimplesNacional", "SimplesMensal")], dir.path()).await;

        let first = sync.run(SyncKind::Full, None).await.unwrap();
        assert_eq!(first.new_processes, 1);
        assert_eq!(first.total_processes, 1);
        assert_eq!(first.competence, "10/2025");
        let counts = sync.store.table_counts().await.unwrap();
        assert_eq!(counts.steps, 4);
        assert_eq!(counts.branch_questions, 0);

        let second = sync.run(SyncKind::Full, None).await.unwrap();
        assert_eq!(second.new_processes, 0);
        assert_eq!(second.updated_processes, 0);
        assert_eq!(second.unchanged_processes, 1);

        let after = sync.store.table_counts().await.unwrap();
        assert_eq!(after.processes, counts.processes);
        assert_eq!(after.steps, counts.steps);
        assert_eq!(after.sync_runs, 2);
        detail.assert_hits(2);
    }

    #[tokio::test]
    async fn test_incremental_skips_unchanged_and_updates_changed() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let regimes = vec![RegimeSettings::new("SimplesNacional", "SimplesMensal")];

        let (mut page1, mut page2) = mock_listing(
            &server,
            "SimplesMensal",
            json!([{"ProcID": 501, "ProcStatus": "Em andamento", "ProcPorcentagem": 50}]),
        );
        let mut detail = server.mock(|when, then| {
            when.method(GET).path("/processes/501");
            then.status(200).json_body(detail_501(2, 50));
        });

        let sync = service(&server, regimes, dir.path()).await;
        sync.run(SyncKind::Full, None).await.unwrap();

        // Listagem igual: nenhum detalhe buscado
        let report = sync.run(SyncKind::Incremental, None).await.unwrap();
        assert_eq!(report.skipped_processes, 1);
        assert_eq!(report.unchanged_processes, 1);
        detail.assert_hits(1);

        // Passo 3 concluído, 75%
        page1.delete();
        page2.delete();
        detail.delete();
        mock_listing(
            &server,
            "SimplesMensal",
            json!([{"ProcID": 501, "ProcStatus": "Em andamento", "ProcPorcentagem": 75}]),
        );
        server.mock(|when, then| {
            when.method(GET).path("/processes/501");
            then.status(200).json_body(detail_501(3, 75));
        });

        let report = sync.run(SyncKind::Incremental, None).await.unwrap();
        assert_eq!(report.updated_processes, 1);
        assert_eq!(report.new_processes, 0);

        let latest = sync.store.latest_sync_run().await.unwrap().unwrap();
        assert_eq!(latest.updated_processes, 1);
        assert_eq!(latest.new_processes, 0);
        assert_eq!(latest.status, SyncStatus::Completed);

        let process = sync.store.find_process_by_external_id(501).await.unwrap().unwrap();
        assert_eq!(process.done_steps, 3);
        assert_eq!(process.completion_pct, 75.0);
    }

    #[tokio::test]
    async fn test_auth_error_aborts_run() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        server.mock(|when, then| {
            when.method(GET).path("/processes/ListAll/");
            then.status(401).json_body(json!({"message": "Token inválido"}));
        });

        let sync = service(&server, vec![RegimeSettings::new("SimplesNacional", "SimplesMensal")], dir.path()).await;
        let err = sync.run(SyncKind::Full, Some("09/2025")).await.unwrap_err();
        assert!(matches!(err, SyncError::Source(AcessoriasError::AuthError(_))));

        let latest = sync.store.latest_sync_run().await.unwrap().unwrap();
        assert_eq!(latest.status, SyncStatus::Error);
        assert_eq!(latest.competence, "09/2025");
        assert!(latest.error_message.is_some());
    }

    #[tokio::test]
    async fn test_missing_detail_is_counted_and_run_continues() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        mock_listing(
            &server,
            "SimplesMensal",
            json!([{"ProcID": 501}, {"ProcID": 502}, {"ProcID": 503}]),
        );
        server.mock(|when, then| {
            when.method(GET).path("/processes/501");
            then.status(200).json_body(detail_501(2, 50));
        });
        server.mock(|when, then| {
            when.method(GET).path("/processes/502");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(GET).path("/processes/503");
            then.status(200).json_body(json!({"ProcID": 503, "EmpNome": "Oficina Silva"}));
        });

        let sync = service(&server, vec![RegimeSettings::new("SimplesNacional", "SimplesMensal")], dir.path()).await;
        let report = sync.run(SyncKind::Full, None).await.unwrap();

        assert_eq!(report.total_processes, 3);
        assert_eq!(report.new_processes, 2);
        assert_eq!(report.failed_processes, 1);
        assert_eq!(report.status, SyncStatus::Completed);
    }

    #[tokio::test]
    async fn test_listing_dedupes_across_regimes() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        mock_listing(&server, "SimplesMensal", json!([{"ProcID": 501}, {"ProcID": 502}]));
        mock_listing(&server, "LucroRealServicos", json!([{"ProcID": 502}, {"ProcID": 700}]));

        let sync = service(
            &server,
            vec![
                RegimeSettings::new("SimplesNacional", "SimplesMensal"),
                RegimeSettings::new("LucroReal_Servicos", "LucroRealServicos"),
            ],
            dir.path(),
        )
        .await;

        let candidates = sync.list_candidates().await.unwrap();
        assert_eq!(candidates.len(), 3);

        let regimes = regimes_by_id(&candidates);
        assert_eq!(regimes[&502], "SimplesNacional");
        assert_eq!(regimes[&700], "LucroReal_Servicos");
    }

    #[tokio::test]
    async fn test_sync_invalidates_metrics_cache() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        mock_listing(&server, "SimplesMensal", json!([{"ProcID": 501}]));
        server.mock(|when, then| {
            when.method(GET).path("/processes/501");
            then.status(200).json_body(detail_501(2, 50));
        });

        let sync = service(&server, vec![RegimeSettings::new("SimplesNacional", "SimplesMensal")], dir.path()).await;
        let metrics = crate::services::metrics::compute_dashboard_metrics(&sync.store, "10/2025")
            .await
            .unwrap();
        sync.cache.put(&metrics).await.unwrap();
        assert!(sync.cache.get("10/2025").await.is_some());

        sync.run(SyncKind::Full, None).await.unwrap();
        assert!(sync.cache.get("10/2025").await.is_none());
    }

    #[tokio::test]
    async fn test_sync_invalidates_every_touched_competence() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        mock_listing(&server, "SimplesMensal", json!([{"ProcID": 610}]));
        server.mock(|when, then| {
            when.method(GET).path("/processes/610");
            then.status(200).json_body(detail(610, 1, 25, "09/2025"));
        });

        let sync = service(&server, vec![RegimeSettings::new("SimplesNacional", "SimplesMensal")], dir.path()).await;
        for competence in ["10/2025", "09/2025", "08/2025"] {
            let metrics = crate::services::metrics::compute_dashboard_metrics(&sync.store, competence)
                .await
                .unwrap();
            sync.cache.put(&metrics).await.unwrap();
        }
        assert_eq!(cached_files(dir.path()), 3);

        sync.run(SyncKind::Full, Some("10/2025")).await.unwrap();

        assert!(sync.cache.get("10/2025").await.is_none());
        assert!(sync.cache.get("09/2025").await.is_none());
        assert!(sync.cache.get("08/2025").await.is_some());
        assert_eq!(cached_files(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_keeps_earlier_batches() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        mock_listing(
            &server,
            "SimplesMensal",
            json!([{"ProcID": 501}, {"ProcID": 502}, {"ProcID": 503}]),
        );
        server.mock(|when, then| {
            when.method(GET).path("/processes/501");
            then.status(200).json_body(detail_501(2, 50));
        });
        server.mock(|when, then| {
            when.method(GET).path("/processes/502");
            then.status(200).json_body(detail(502, 4, 100, "10/2025"));
        });
        server.mock(|when, then| {
            when.method(GET).path("/processes/503");
            then.status(401).json_body(json!({"message": "Token expirado"}));
        });

        // batch_size = 2: 501 e 502 no primeiro lote, 503 no segundo
        let sync = service(&server, vec![RegimeSettings::new("SimplesNacional", "SimplesMensal")], dir.path()).await;
        let err = sync.run(SyncKind::Full, None).await.unwrap_err();
        assert!(matches!(err, SyncError::Source(AcessoriasError::AuthError(_))));

        let latest = sync.store.latest_sync_run().await.unwrap().unwrap();
        assert_eq!(latest.status, SyncStatus::Error);
        assert!(latest.error_message.as_deref().unwrap().contains("401"));
        assert_eq!(latest.total_processes, 3);
        assert_eq!(latest.new_processes, 2);
        assert_eq!(latest.failed_processes, 0);
        assert!(latest.finished_at.is_some());

        assert!(sync.store.find_process_by_external_id(501).await.unwrap().is_some());
        assert!(sync.store.find_process_by_external_id(502).await.unwrap().is_some());
        assert!(sync.store.find_process_by_external_id(503).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_details_fetched_in_bounded_batches() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let delay = Duration::from_millis(300);
        mock_listing(
            &server,
            "SimplesMensal",
            json!([{"ProcID": 701}, {"ProcID": 702}, {"ProcID": 703}, {"ProcID": 704}]),
        );
        let mocks: Vec<_> = (701..=704)
            .map(|id| {
                server.mock(|when, then| {
                    when.method(GET).path(format!("/processes/{}", id));
                    then.status(200).delay(delay).json_body(detail(id, 1, 25, "10/2025"));
                })
            })
            .collect();

        let sync = service(&server, vec![RegimeSettings::new("SimplesNacional", "SimplesMensal")], dir.path()).await;
        let started = std::time::Instant::now();
        let report = sync.run(SyncKind::Full, None).await.unwrap();

        // 4 detalhes em lotes de 2: dois lotes em sequência
        assert!(started.elapsed() >= delay * 2);
        assert_eq!(report.new_processes, 4);
        assert_eq!(report.fetched_processes, 4);
        for mock in &mocks {
            mock.assert_hits(1);
        }
    }

    #[test]
    fn test_needs_fetch() {
        let stored = Fingerprint {
            status: ProcessStatus::InProgress,
            completion_pct: 50.0,
        };
        let listing = |value: Value| -> ProcessRecord { serde_json::from_value(value).unwrap() };

        assert!(needs_fetch(&listing(json!({"ProcID": 1})), None));
        assert!(needs_fetch(&listing(json!({"ProcID": 1})), Some(&stored)));
        assert!(!needs_fetch(
            &listing(json!({"ProcID": 1, "ProcStatus": "Em andamento", "ProcPorcentagem": "50,0%"})),
            Some(&stored)
        ));
        assert!(needs_fetch(
            &listing(json!({"ProcID": 1, "ProcPorcentagem": 75})),
            Some(&stored)
        ));
        assert!(needs_fetch(
            &listing(json!({"ProcID": 1, "ProcStatus": "Concluído"})),
            Some(&stored)
        ));
    }
}
