//! Identificação de comandos do menu

/// Comandos suportados pelo menu do WhatsApp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Menu,
    GeneralSummary,
    RegimeSummary,
    LateProcesses,
    StalledCompanies,
    Bottlenecks,
    PendingQuestions,
    SearchByName,
    SearchByTaxId,
    Help,
    About,
}

/// Apelidos aceitos para cada comando (número ou palavra-chave)
const ALIASES: &[(&str, Command)] = &[
    ("0", Command::Menu),
    ("menu", Command::Menu),
    ("inicio", Command::Menu),
    ("início", Command::Menu),
    ("1", Command::GeneralSummary),
    ("resumo geral", Command::GeneralSummary),
    ("resumo", Command::GeneralSummary),
    ("kpis", Command::GeneralSummary),
    ("2", Command::RegimeSummary),
    ("resumo regime", Command::RegimeSummary),
    ("por regime", Command::RegimeSummary),
    ("regimes", Command::RegimeSummary),
    ("9", Command::LateProcesses),
    ("atrasados", Command::LateProcesses),
    ("críticos", Command::LateProcesses),
    ("criticos", Command::LateProcesses),
    ("12", Command::StalledCompanies),
    ("paradas", Command::StalledCompanies),
    ("bloqueadas", Command::StalledCompanies),
    ("13", Command::Bottlenecks),
    ("gargalos", Command::Bottlenecks),
    ("gargalo", Command::Bottlenecks),
    ("14", Command::PendingQuestions),
    ("desdobramentos", Command::PendingQuestions),
    ("20", Command::SearchByName),
    ("buscar empresa", Command::SearchByName),
    ("21", Command::SearchByTaxId),
    ("buscar cnpj", Command::SearchByTaxId),
    ("cnpj", Command::SearchByTaxId),
    ("23", Command::Help),
    ("ajuda", Command::Help),
    ("help", Command::Help),
    ("?", Command::Help),
    ("24", Command::About),
    ("sobre", Command::About),
];

/// Palavras-chave curtas geram falso positivo na busca parcial
const MIN_PARTIAL_ALIAS_LEN: usize = 4;

impl Command {
    /// Identifica o comando: busca exata primeiro, depois por palavra-chave contida
    ///
    /// A busca parcial só considera apelidos textuais com 4+ caracteres, para
    /// que "1" não case com "10" nem "cnpj" dentro de um nome de empresa curto.
    pub fn identify(text: &str) -> Option<Command> {
        let cmd = text.trim().to_lowercase();
        if cmd.is_empty() {
            return None;
        }

        if let Some((_, command)) = ALIASES.iter().find(|(alias, _)| *alias == cmd) {
            return Some(*command);
        }

        ALIASES
            .iter()
            .filter(|(alias, _)| {
                alias.chars().count() >= MIN_PARTIAL_ALIAS_LEN
                    && !alias.chars().all(|c| c.is_ascii_digit())
            })
            .find(|(alias, _)| contains_word(&cmd, alias))
            .map(|(_, command)| *command)
    }

    /// Comandos de dois passos deixam uma pendência na sessão
    pub fn is_two_step(&self) -> bool {
        matches!(self, Command::SearchByName | Command::SearchByTaxId)
    }
}

/// `alias` aparece em `text` delimitado por espaço ou borda
fn contains_word(text: &str, alias: &str) -> bool {
    text.match_indices(alias).any(|(start, _)| {
        let end = start + alias.len();
        let before_ok = text[..start].chars().last().map_or(true, |c| !c.is_alphanumeric());
        let after_ok = text[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
