//! Processador de comandos: roteia a mensagem para o relatório correto

use crate::commands::Command;
use crate::formatter;
use crate::reports::{ReportResult, ReportSource};
use crate::session::{PendingCommand, SessionStore};

/// Texto com mais caracteres que isso, sem comando reconhecido, vira busca de empresa
const MIN_SEARCH_LEN: usize = 3;

/// Processador sem estado próprio: sessões e dados entram por referência
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    competence: String,
    list_limit: usize,
}

impl CommandProcessor {
    pub fn new(competence: impl Into<String>) -> Self {
        Self {
            competence: competence.into(),
            list_limit: 10,
        }
    }

    pub fn with_list_limit(mut self, limit: usize) -> Self {
        self.list_limit = limit.max(1);
        self
    }

    /// Processa uma mensagem e devolve a resposta formatada
    pub async fn process<S: ReportSource>(
        &self,
        sessions: &SessionStore,
        source: &S,
        session_key: &str,
        message: &str,
    ) -> String {
        let text = message.trim();

        if let Some(pending) = sessions.take(session_key).await {
            tracing::info!("💬 Sessão '{}' respondeu pendência {:?}", session_key, pending);
            // "0" cancela a pendência e volta ao menu
            if Command::identify(text) == Some(Command::Menu) {
                return formatter::main_menu(&self.competence);
            }
            return self.search(source, text).await;
        }

        match Command::identify(text) {
            Some(command) => {
                tracing::info!("🤖 Comando {:?} de '{}'", command, session_key);
                match self.execute(command, sessions, source, session_key).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::error!("❌ Erro ao executar {:?}: {}", command, e);
                        formatter::processing_error(&e.to_string())
                    }
                }
            }
            None if text.chars().count() > MIN_SEARCH_LEN => self.search(source, text).await,
            None => formatter::invalid_command(text),
        }
    }

    async fn execute<S: ReportSource>(
        &self,
        command: Command,
        sessions: &SessionStore,
        source: &S,
        session_key: &str,
    ) -> ReportResult<String> {
        let competence = self.competence.as_str();
        let limit = self.list_limit;

        let reply = match command {
            Command::Menu => formatter::main_menu(competence),
            Command::Help => formatter::help(),
            Command::About => formatter::about(competence),
            Command::GeneralSummary => {
                let data = source.general_summary(competence).await?;
                formatter::general_summary(&data, competence)
            }
            Command::RegimeSummary => {
                let data = source.regime_summaries(competence).await?;
                formatter::regime_summary(&data, competence)
            }
            Command::LateProcesses => {
                let data = source.late_processes(competence, limit).await?;
                formatter::late_processes(&data)
            }
            Command::StalledCompanies => {
                let data = source.stalled_processes(competence, limit).await?;
                formatter::stalled_processes(&data)
            }
            Command::Bottlenecks => {
                let data = source.bottlenecks(competence, limit).await?;
                formatter::bottlenecks(&data)
            }
            Command::PendingQuestions => {
                let data = source.pending_questions(competence, limit * 2).await?;
                formatter::pending_questions(&data)
            }
            Command::SearchByName => {
                sessions.set(session_key, PendingCommand::AwaitingCompanyName).await;
                formatter::ask_company_name()
            }
            Command::SearchByTaxId => {
                sessions.set(session_key, PendingCommand::AwaitingTaxId).await;
                formatter::ask_tax_id()
            }
        };

        Ok(reply)
    }

    async fn search<S: ReportSource>(&self, source: &S, term: &str) -> String {
        match source.search_companies(term, 5).await {
            Ok(matches) => formatter::company_matches(term, &matches),
            Err(e) => {
                tracing::error!("❌ Erro na busca de empresa '{}': {}", term, e);
                formatter::processing_error(&e.to_string())
            }
        }
    }
}
