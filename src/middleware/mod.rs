/// Middleware layer para o Axum router
///
/// Este módulo contém:
/// - Autenticação de endpoints administrativos (sync manual, exportação)
/// - Validação da assinatura do webhook do WhatsApp

pub mod admin_auth;
pub mod signature;

pub use admin_auth::require_admin_key;
pub use signature::{constant_time_eq, verify_signature};
