//! Menu de comandos do WhatsApp para gestores
//!
//! Comportamento:
//! - Comandos por número ou palavra-chave ("1", "resumo geral", "gargalos")
//! - Comandos de dois passos (busca por nome/CNPJ) deixam uma pendência na
//!   sessão do telefone; a próxima mensagem consome a pendência
//! - Pendências expiram (5 minutos por padrão)
//! - Os dados vêm de um [`ReportSource`], implementado sobre o banco local
//!
//! Exemplo:
//! ```text
//! Gestor: 21          -> "🔎 Digite o CNPJ da empresa:"   (pendência AwaitingTaxId)
//! Gestor: 12345678    -> resultado da busca              (pendência consumida)
//! Gestor: padaria     -> busca direta por nome (texto livre > 3 letras)
//! ```

pub mod commands;
pub mod formatter;
pub mod processor;
pub mod reports;
pub mod session;

pub use commands::Command;
pub use processor::CommandProcessor;
pub use reports::{
    Bottleneck, CompanyMatch, CompanyProcess, GeneralSummary, PendingQuestion, ProcessAlert,
    RegimeSummary, ReportResult, ReportSource,
};
pub use session::{PendingCommand, SessionStore};
