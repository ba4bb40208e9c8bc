//! Listagem paginada e detalhe de processos

use crate::client::AcessoriasClient;
use crate::error::Result;
use crate::types::ProcessRecord;
use serde_json::Value;

/// Filtros da listagem (`ProcStatus` / `ProcNome`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessQuery {
    /// "A" (em andamento), "C" (concluídos) ...
    pub status: Option<String>,
    /// Nome do modelo de processo, ex.: "Lucro Real - Serviços"
    pub name: Option<String>,
}

impl ProcessQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn to_params(&self, page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![("Pagina", page.to_string())];
        if let Some(status) = &self.status {
            params.push(("ProcStatus", status.clone()));
        }
        if let Some(name) = &self.name {
            params.push(("ProcNome", name.clone()));
        }
        params
    }
}

impl AcessoriasClient {
    /// Busca uma página da listagem de processos
    ///
    /// Objeto único vira lista de um elemento; elementos malformados são ignorados.
    pub async fn list_page(&self, query: &ProcessQuery, page: u32) -> Result<Vec<ProcessRecord>> {
        let params = query.to_params(page);
        let value = self.get_json("/processes/ListAll/", &params).await?;
        Ok(records_from_value(value))
    }

    /// Percorre todas as páginas até a primeira página vazia
    pub async fn list_all(&self, query: &ProcessQuery) -> Result<Vec<ProcessRecord>> {
        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            let records = self.list_page(query, page).await?;
            if records.is_empty() {
                break;
            }

            tracing::debug!("📄 Página {} com {} processos ({:?})", page, records.len(), query);
            all.extend(records);
            page += 1;

            if !self.page_delay().is_zero() {
                tokio::time::sleep(self.page_delay()).await;
            }
        }

        tracing::info!(
            "📋 Listagem concluída: {} processos em {} páginas (status={:?}, nome={:?})",
            all.len(),
            page - 1,
            query.status,
            query.name
        );
        Ok(all)
    }

    /// Detalhe completo de um processo, com passos e desdobramentos
    pub async fn detail(&self, process_id: i64) -> Result<Option<ProcessRecord>> {
        let endpoint = format!("/processes/{}", process_id);
        let value = match self.get_json(&endpoint, &[]).await? {
            Some(Value::Array(mut items)) => {
                if items.is_empty() {
                    return Ok(None);
                }
                items.swap_remove(0)
            }
            Some(value @ Value::Object(_)) => value,
            Some(other) => {
                tracing::warn!("⚠️ Detalhe do processo {} em formato inesperado: {}", process_id, other);
                return Ok(None);
            }
            None => return Ok(None),
        };

        let record = serde_json::from_value::<ProcessRecord>(value)?;
        Ok(Some(record))
    }

    /// Chamada barata para checar token e conectividade
    ///
    /// `Ok(false)` quando a API não responde com sucesso; token rejeitado é erro.
    pub async fn test_connection(&self) -> Result<bool> {
        self.reachable("/processes/ListAll/", &[("Pagina", "1".to_string())]).await
    }
}

fn records_from_value(value: Option<Value>) -> Vec<ProcessRecord> {
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(obj @ Value::Object(_)) => vec![obj],
        Some(other) => {
            tracing::warn!("⚠️ Listagem em formato inesperado: {}", other);
            Vec::new()
        }
        None => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ProcessRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("⚠️ Registro de listagem ignorado: {}", e);
                None
            }
        })
        .collect()
}
