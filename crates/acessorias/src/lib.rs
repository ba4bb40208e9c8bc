//! Cliente da API Acessórias
//!
//! Interface tipada para os endpoints de processos usados pela sincronização:
//!
//! - **Listagem**: `/processes/ListAll/?Pagina=N&ProcStatus=..&ProcNome=..`
//! - **Detalhe**: `/processes/{id}` (passos, sub processos e desdobramentos)
//!
//! Todas as chamadas passam por um rate limiter de janela deslizante
//! (90 req/min por padrão). Recursos ausentes (404, 204, timeout) viram `None`;
//! apenas token inválido é tratado como erro fatal.
//!
//! # Exemplo Básico
//!
//! ```rust,ignore
//! use acessorias::{AcessoriasClient, ProcessQuery};
//!
//! #[tokio::main]
//! async fn main() -> acessorias::Result<()> {
//!     let token = std::env::var("ACESSORIAS_API_TOKEN")
//!         .expect("ACESSORIAS_API_TOKEN não configurado");
//!     let client = AcessoriasClient::new(token)?;
//!
//!     let query = ProcessQuery::new().status("A").name("Lucro Real - Serviços");
//!     for record in client.list_all(&query).await? {
//!         if let Some(id) = record.id {
//!             let detail = client.detail(id).await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod processes;
pub mod rate_limit;
pub mod types;

pub use client::{AcessoriasClient, ClientOptions};
pub use error::{AcessoriasError, Result};
pub use processes::ProcessQuery;
pub use rate_limit::RateLimiter;
pub use types::{
    ActionRecord, Automation, AutomationRules, ChoiceRecord, Delivery, ProcessRecord, StepList,
    StepRecord,
};
