//! Normalização de textos vindos da Acessórias
//!
//! Nomes de empresa, tipos de passo e competências chegam com acentos,
//! caixa e formatos variados; as funções aqui deixam tudo comparável.

use chrono::NaiveDate;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Remove acentos, converte para lowercase, remove espaços extras e caracteres especiais
/// usando NFKD (Normalization Form Compatibility Decomposition)
///
/// # Exemplos
/// ```
/// use acessorias_processos::utils::normalization::normalize_string;
///
/// assert_eq!(normalize_string("Padaria São João Ltda."), "padaria sao joao ltda");
/// assert_eq!(normalize_string("  Sub   Processo "), "sub processo");
/// ```
pub fn normalize_string(input: &str) -> String {
    input
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mantém apenas os dígitos (CNPJ/CPF com ou sem máscara)
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normaliza uma competência para `MM/YYYY`
///
/// Aceita `10/2025`, `1/2025`, `10-2025`, `2025-10` e `202510`.
pub fn normalize_competence(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let parts: Vec<&str> = trimmed
        .split(|c| c == '/' || c == '-')
        .filter(|p| !p.is_empty())
        .collect();

    let (month, year) = match parts.as_slice() {
        [m, y] if y.len() == 4 => (m.parse::<u32>().ok()?, y.parse::<i32>().ok()?),
        [y, m] if y.len() == 4 => (m.parse::<u32>().ok()?, y.parse::<i32>().ok()?),
        [single] if single.len() == 6 && single.chars().all(|c| c.is_ascii_digit()) => {
            (single[4..].parse::<u32>().ok()?, single[..4].parse::<i32>().ok()?)
        }
        _ => return None,
    };

    if !(1..=12).contains(&month) || year < 1900 {
        return None;
    }
    Some(format!("{:02}/{}", month, year))
}

/// Interpreta datas `dd/mm/yyyy` ou ISO (`yyyy-mm-dd`, com ou sem hora)
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    let date_part = trimmed.split(|c| c == ' ' || c == 'T').next().unwrap_or(trimmed);

    NaiveDate::parse_from_str(date_part, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y-%m-%d"))
        .ok()
}

/// Competência (`MM/YYYY`) do mês de uma data
pub fn competence_from_date(input: &str) -> Option<String> {
    parse_date(input).map(|date| date.format("%m/%Y").to_string())
}

/// Chave segura para nomes de arquivo (`10/2025` → `10_2025`)
pub fn competence_file_key(competence: &str) -> String {
    competence
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
