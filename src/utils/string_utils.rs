/// Utilitários para manipulação segura de strings UTF-8

/// Mantém no máximo `max_chars` caracteres (não bytes)
///
/// # Exemplo
/// ```
/// use acessorias_processos::utils::string_utils::truncate_chars;
///
/// assert_eq!(truncate_chars("Construção Ltda", 10), "Construção");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
