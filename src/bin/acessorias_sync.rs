use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use acessorias::AcessoriasClient;
use acessorias_processos::config::Settings;
use acessorias_processos::models::{SyncKind, SyncStatus};
use acessorias_processos::services::{MetricsCache, SpreadsheetExporter, Store, SyncService};
use acessorias_processos::utils::logging::*;

/// Sincronização e exportação para uso em cron
#[derive(Parser)]
#[command(name = "acessorias-sync")]
#[command(version)]
#[command(about = "Sincroniza processos da Acessórias e exporta planilhas", long_about = None)]
struct Cli {
    /// URL do banco (sobrescreve database.url)
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Executa uma sincronização
    Sync {
        /// full ou incremental
        #[arg(short = 'k', long, default_value = "incremental")]
        kind: SyncKind,

        /// Competência alvo (MM/YYYY); padrão: sync.default_competence
        #[arg(short = 'c', long)]
        competence: Option<String>,
    },

    /// Gera as planilhas .xlsx a partir do banco
    Export {
        /// Diretório de saída (padrão: export.output_dir)
        #[arg(short = 'o', long)]
        output_dir: Option<PathBuf>,

        /// Apenas um regime (ex.: SimplesNacional)
        #[arg(short = 'r', long)]
        regime: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut settings = Settings::new().context("falha ao carregar configurações")?;
    if let Some(url) = cli.database_url {
        settings.database.url = url;
    }

    let store = Store::connect(&settings.database.url, settings.database.max_connections)
        .await
        .with_context(|| format!("falha ao abrir o banco {}", settings.database.url))?;

    match cli.command {
        Commands::Sync { kind, competence } => {
            if settings.acessorias.token.is_empty() {
                bail!("ACESSORIAS_API_TOKEN não configurado");
            }
            let client = AcessoriasClient::with_options(
                settings.acessorias.token.clone(),
                settings.acessorias.client_options(),
            )
            .context("falha ao criar cliente da Acessórias")?;
            let cache = MetricsCache::new(&settings.cache.dir, settings.cache_ttl());
            let service = SyncService::new(client, store, cache, settings.sync.clone());

            let report = service
                .run(kind, competence.as_deref())
                .await
                .context("sincronização falhou")?;

            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.status != SyncStatus::Completed {
                bail!("sincronização terminou com status {:?}", report.status);
            }
        }
        Commands::Export { output_dir, regime } => {
            let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(&settings.export.output_dir));
            let exporter = SpreadsheetExporter::new(store, output_dir);

            let files = match regime {
                Some(regime) => vec![exporter.export_regime(&regime).await?],
                None => exporter.export_all().await?,
            };
            if files.is_empty() {
                log_warning("⚠️ Nenhum processo no banco - nenhuma planilha gerada");
            }
            for file in files {
                println!("{}", file.display());
            }
        }
    }

    Ok(())
}
