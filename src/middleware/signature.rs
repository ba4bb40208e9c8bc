//! Assinatura HMAC-SHA256 do webhook do WhatsApp (X-Hub-Signature-256)

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Valida `sha256=<hex>` contra o HMAC do corpo com o segredo do app
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(header) = header else {
        return false;
    };
    // Remove o prefixo "sha256=" se presente
    let signature = header.trim().strip_prefix("sha256=").unwrap_or(header.trim());

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    constant_time_eq(signature.to_ascii_lowercase().as_bytes(), expected.as_bytes())
}

// Comparação de tempo constante para evitar timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_verify_signature() {
        let body = br#"{"entry":[]}"#;
        let header = sign("segredo", body);

        assert!(verify_signature("segredo", body, Some(&header)));
        assert!(verify_signature("segredo", body, header.strip_prefix("sha256=")));
        assert!(!verify_signature("outro", body, Some(&header)));
        assert!(!verify_signature("segredo", b"{}", Some(&header)));
        assert!(!verify_signature("segredo", body, None));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
