//! Exportação para planilhas (.xlsx), uma pasta de trabalho por regime
//!
//! Abas: PROCESSOS_GERAL, PROCESSOS_PASSOS e PROCESSOS_DESDOBRAMENTOS.
//! Cabeçalho em negrito com fundo azul, painéis congelados na linha 1 e nas
//! duas primeiras colunas, autofiltro em toda a tabela.

use chrono::Local;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet, XlsxError};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::services::store::{ProcessSheetRow, QuestionSheetRow, StepSheetRow, Store};
use crate::utils::logging::*;

const HEADER_COLOR: u32 = 0x1F4E78;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("erro ao gerar planilha: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("erro no banco: {0}")]
    Store(#[from] sqlx::Error),

    #[error("erro de arquivo: {0}")]
    Io(#[from] std::io::Error),

    #[error("tarefa de gravação interrompida: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("regime sem processos: {0}")]
    EmptyRegime(String),
}

/// Valor de uma célula
enum Cell {
    Text(String),
    Number(f64),
    Percent(f64),
    Empty,
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map(Cell::Text).unwrap_or(Cell::Empty)
    }
}

fn yes_no(value: bool) -> Cell {
    Cell::Text(if value { "Sim" } else { "Não" }.to_string())
}

/// Título e largura de coluna
type Column = (&'static str, f64);

const PROCESS_COLUMNS: &[Column] = &[
    ("PROC_ID", 10.0),
    ("EMPRESA", 40.0),
    ("CNPJ", 18.0),
    ("PROCESSO", 35.0),
    ("COMPETENCIA", 12.0),
    ("STATUS", 15.0),
    ("PORCENTAGEM", 12.0),
    ("PASSOS_TOTAL", 12.0),
    ("PASSOS_CONCLUIDOS", 18.0),
    ("DIAS_CORRIDOS", 14.0),
    ("GESTOR", 20.0),
    ("ULTIMA_ALTERACAO", 18.0),
];

const STEP_COLUMNS: &[Column] = &[
    ("PROC_ID", 10.0),
    ("EMPRESA", 40.0),
    ("PASSO_ORDEM", 10.0),
    ("PASSO_TIPO", 20.0),
    ("PASSO_NOME", 50.0),
    ("PASSO_STATUS", 12.0),
    ("CONCLUIDO", 10.0),
    ("RESPONSAVEL", 25.0),
    ("PRAZO", 14.0),
];

const QUESTION_COLUMNS: &[Column] = &[
    ("PROC_ID", 10.0),
    ("EMPRESA", 40.0),
    ("PASSO_ORDEM", 10.0),
    ("PERGUNTA", 50.0),
    ("RESPOSTA", 25.0),
    ("ACAO_TIPO", 15.0),
    ("ACAO_NOME", 30.0),
    ("RESPONDIDO", 12.0),
];

pub struct SpreadsheetExporter {
    store: Store,
    output_dir: PathBuf,
}

impl SpreadsheetExporter {
    pub fn new(store: Store, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            output_dir: output_dir.into(),
        }
    }

    /// Uma pasta de trabalho por regime presente no banco
    pub async fn export_all(&self) -> Result<Vec<PathBuf>, ExportError> {
        let mut files = Vec::new();
        for regime in self.store.regimes().await? {
            files.push(self.export_regime(&regime).await?);
        }
        log_info(&format!("📊 {} planilhas exportadas em {}", files.len(), self.output_dir.display()));
        Ok(files)
    }

    pub async fn export_regime(&self, regime: &str) -> Result<PathBuf, ExportError> {
        let processes = self.store.process_sheet(regime).await?;
        if processes.is_empty() {
            return Err(ExportError::EmptyRegime(regime.to_string()));
        }
        let steps = self.store.step_sheet(regime).await?;
        let questions = self.store.question_sheet(regime).await?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = unused_path(&self.output_dir, regime).await?;

        let (process_count, step_count, question_count) = (processes.len(), steps.len(), questions.len());
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), XlsxError> {
            let mut workbook = build_workbook(&processes, &steps, &questions)?;
            workbook.save(&target)
        })
        .await??;

        log_info(&format!(
            "✅ Planilha {}: {} processos, {} passos, {} desdobramentos",
            path.display(),
            process_count,
            step_count,
            question_count
        ));
        Ok(path)
    }
}

/// `<regime>_DadosBrutos_<timestamp com ms>.xlsx`, com sufixo se já existir
async fn unused_path(dir: &Path, regime: &str) -> Result<PathBuf, std::io::Error> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
    let mut path = dir.join(format!("{}_DadosBrutos_{}.xlsx", regime, stamp));
    let mut counter = 1;
    while tokio::fs::try_exists(&path).await? {
        path = dir.join(format!("{}_DadosBrutos_{}_{}.xlsx", regime, stamp, counter));
        counter += 1;
    }
    Ok(path)
}

fn build_workbook(
    processes: &[ProcessSheetRow],
    steps: &[StepSheetRow],
    questions: &[QuestionSheetRow],
) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();

    let process_rows: Vec<Vec<Cell>> = processes
        .iter()
        .map(|p| {
            vec![
                Cell::Number(p.external_id as f64),
                Cell::Text(p.company_name.clone()),
                p.tax_id.clone().into(),
                Cell::Text(p.name.clone()),
                Cell::Text(p.competence.clone()),
                Cell::Text(p.status.label().to_string()),
                Cell::Percent(p.completion_pct),
                Cell::Number(p.total_steps as f64),
                Cell::Number(p.done_steps as f64),
                Cell::Number(p.elapsed_days as f64),
                p.manager.clone().into(),
                Cell::Text(p.updated_at.format("%d/%m/%Y %H:%M").to_string()),
            ]
        })
        .collect();
    write_sheet(
        workbook.add_worksheet(),
        "PROCESSOS_GERAL",
        PROCESS_COLUMNS,
        &process_rows,
        "Nenhum processo encontrado",
    )?;

    let step_rows: Vec<Vec<Cell>> = steps
        .iter()
        .map(|s| {
            vec![
                Cell::Number(s.process_external_id as f64),
                Cell::Text(s.company_name.clone()),
                Cell::Number(s.ordinal as f64),
                Cell::Text(s.kind.clone()),
                Cell::Text(s.name.clone()),
                s.status.clone().into(),
                yes_no(s.done),
                s.owner.clone().into(),
                s.deadline.clone().into(),
            ]
        })
        .collect();
    write_sheet(
        workbook.add_worksheet(),
        "PROCESSOS_PASSOS",
        STEP_COLUMNS,
        &step_rows,
        "Nenhum passo encontrado",
    )?;

    let question_rows: Vec<Vec<Cell>> = questions
        .iter()
        .map(|q| {
            vec![
                Cell::Number(q.process_external_id as f64),
                Cell::Text(q.company_name.clone()),
                Cell::Number(q.step_ordinal as f64),
                Cell::Text(q.question.clone()),
                q.selected_answer.clone().into(),
                q.action_kind.clone().into(),
                q.action_name.clone().into(),
                yes_no(q.answered),
            ]
        })
        .collect();
    write_sheet(
        workbook.add_worksheet(),
        "PROCESSOS_DESDOBRAMENTOS",
        QUESTION_COLUMNS,
        &question_rows,
        "Nenhum desdobramento encontrado",
    )?;

    Ok(workbook)
}

fn write_sheet(
    sheet: &mut Worksheet,
    name: &str,
    columns: &[Column],
    rows: &[Vec<Cell>],
    empty_note: &str,
) -> Result<(), XlsxError> {
    sheet.set_name(name)?;

    if rows.is_empty() {
        sheet.write_string(0, 0, empty_note)?;
        sheet.set_column_width(0, 40)?;
        return Ok(());
    }

    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_COLOR))
        .set_align(FormatAlign::Center)
        .set_text_wrap();
    let percent = Format::new().set_num_format("0.00\"%\"");

    for (col, (title, width)) in columns.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *title, &header)?;
        sheet.set_column_width(col, *width)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let r = index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) => {
                    sheet.write_string(r, col, text)?;
                }
                Cell::Number(value) => {
                    sheet.write_number(r, col, *value)?;
                }
                Cell::Percent(value) => {
                    sheet.write_number_with_format(r, col, *value, &percent)?;
                }
                Cell::Empty => {}
            }
        }
    }

    sheet.set_freeze_panes(1, 2)?;
    sheet.autofilter(0, 0, rows.len() as u32, columns.len() as u16 - 1)?;
    Ok(())
}
