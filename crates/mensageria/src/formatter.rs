//! Formatação das respostas para WhatsApp (otimizada para mobile)

use crate::reports::{
    Bottleneck, CompanyMatch, GeneralSummary, PendingQuestion, ProcessAlert, RegimeSummary,
};

const BOX_WIDTH: usize = 37;
const FOOTER: &str = "Digite outro número ou 0 para menu";

fn separator() -> String {
    "━".repeat(39)
}

/// Título em caixa
pub fn box_title(title: &str) -> String {
    let len = title.chars().count();
    let padding = BOX_WIDTH.saturating_sub(len) / 2;
    let mut line = format!("{}{}{}", " ".repeat(padding), title, " ".repeat(padding));
    if line.chars().count() < BOX_WIDTH {
        line.push(' ');
    }
    let bar = "═".repeat(BOX_WIDTH);
    format!("╔{bar}╗\n║{line}║\n╚{bar}╝")
}

/// Barra de progresso com 10 blocos
pub fn progress_bar(percentage: f64) -> String {
    let size = 10usize;
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * size as f64) as usize;
    format!("{}{}", "▓".repeat(filled), "░".repeat(size - filled))
}

pub fn status_emoji(percentage: f64) -> &'static str {
    if percentage >= 75.0 {
        "🟢"
    } else if percentage >= 50.0 {
        "🟡"
    } else if percentage >= 25.0 {
        "🟠"
    } else {
        "🔴"
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

pub fn main_menu(competence: &str) -> String {
    let sep = separator();
    format!(
        "{title}\n       Competência: {competence}\n\n\
📊 RESUMOS EXECUTIVOS\n{sep}\n\
1️⃣ Resumo Geral (KPIs principais)\n\
2️⃣ Resumo por Regime Tributário\n\n\
🚨 ALERTAS E GARGALOS\n{sep}\n\
9️⃣ Processos Atrasados/Críticos\n\
1️⃣2️⃣ Empresas Paradas (0% progresso)\n\
1️⃣3️⃣ Gargalos por Tipo de Passo\n\
1️⃣4️⃣ Desdobramentos Não Respondidos\n\n\
🔎 CONSULTAS\n{sep}\n\
2️⃣0️⃣ Buscar por Nome da Empresa\n\
2️⃣1️⃣ Buscar por CNPJ\n\n\
⚙️ CONFIGURAÇÕES\n{sep}\n\
2️⃣3️⃣ Ajuda (Lista de Comandos)\n\
2️⃣4️⃣ Sobre o Sistema\n\n\
{sep}\n💡 Digite o número ou palavra-chave\n   Ex: \"1\" ou \"resumo geral\"",
        title = box_title("🤖 GESTOR DE PROCESSOS CONTÁBEIS"),
    )
}

pub fn help() -> String {
    let sep = separator();
    format!(
        "{title}\n\n\
Comandos aceitos (número ou palavra):\n{sep}\n\
0 / menu: volta ao menu\n\
1 / resumo: KPIs da competência\n\
2 / regimes: comparação por regime\n\
9 / atrasados: processos há mais tempo abertos\n\
12 / paradas: empresas sem progresso\n\
13 / gargalos: passos com mais pendências\n\
14 / desdobramentos: perguntas sem resposta\n\
20 / buscar empresa: busca por nome\n\
21 / cnpj: busca por CNPJ\n\n\
Qualquer texto com mais de 3 letras é buscado como nome de empresa.\n\n{FOOTER}",
        title = box_title("❔ AJUDA"),
    )
}

pub fn about(competence: &str) -> String {
    format!(
        "{title}\n\nAcompanhamento dos processos contábeis sincronizados da Acessórias.\n\
Competência atual: {competence}\nDados atualizados a cada sincronização.\n\n{FOOTER}",
        title = box_title("ℹ️ SOBRE O SISTEMA"),
    )
}

pub fn general_summary(data: &GeneralSummary, competence: &str) -> String {
    let sep = separator();
    let completion = data.completion_rate();
    let stalled_rate = if data.total_processes > 0 {
        data.stalled as f64 / data.total_processes as f64 * 100.0
    } else {
        0.0
    };
    let deadline = if data.avg_days <= 30.0 { "Dentro do prazo" } else { "Atrasado" };
    let deadline_emoji = status_emoji(100.0 - data.avg_days / 30.0 * 100.0);
    let step_rate = data.step_rate();
    let question_rate = data.question_rate();
    let pending_questions = data.total_questions - data.answered_questions;

    let mut text = format!(
        "{title}\n\n\
🏢 EMPRESAS\n{sep}\n\
Total: {companies} empresas / {processes} processos\n\
✅ Concluídos: {completed} ({completion:.1}%)\n\
⏳ Em Andamento: {in_progress}\n\
🛑 Parados (0%): {stalled} ({stalled_rate:.1}%)\n\n\
📈 PROGRESSO MÉDIO\n{sep}\n\
Geral: {bar} {avg_progress:.1}%\n\n\
⏱️ TEMPO MÉDIO\n{sep}\n\
Dias corridos: {avg_days:.1} dias\n\
Mínimo: {min_days} dias\n\
Máximo: {max_days} dias\n\
Status: {deadline_emoji} {deadline}\n\n\
🎯 PASSOS\n{sep}\n\
Total: {total_steps} passos\n\
✅ Concluídos: {done_steps} ({step_rate:.1}%)\n\n\
❓ DESDOBRAMENTOS\n{sep}\n\
Total: {total_questions} perguntas\n\
✅ Respondidos: {answered} ({question_rate:.1}%)\n\
⏳ Pendentes: {pending_questions}\n",
        title = box_title(&format!("📊 RESUMO GERAL - {}", competence)),
        companies = data.total_companies,
        processes = data.total_processes,
        completed = data.completed,
        in_progress = data.in_progress,
        stalled = data.stalled,
        bar = progress_bar(data.avg_progress),
        avg_progress = data.avg_progress,
        avg_days = data.avg_days,
        min_days = data.min_days,
        max_days = data.max_days,
        total_steps = data.total_steps,
        done_steps = data.done_steps,
        total_questions = data.total_questions,
        answered = data.answered_questions,
    );

    if pending_questions > 0 || data.stalled > 0 {
        text.push_str(&format!("\n🚨 ALERTAS\n{sep}\n"));
        if pending_questions > 0 {
            text.push_str(&format!("🔴 {} desdobramentos pendentes\n", pending_questions));
        }
        if data.stalled > 0 {
            text.push_str(&format!("🟡 {} processos sem nenhum progresso\n", data.stalled));
        }
    }

    text.push_str(&format!("\n{sep}\n{FOOTER}"));
    text
}

pub fn regime_summary(data: &[RegimeSummary], competence: &str) -> String {
    let sep = separator();
    let mut lines = vec![box_title(&format!("📊 ANÁLISE POR REGIME - {}", competence)), String::new()];

    if data.is_empty() {
        lines.push("⚠️ Nenhum processo sincronizado para esta competência.".to_string());
    }

    for regime in data {
        let rate = regime.completion_rate();
        let emoji = if regime.regime.contains("Simples") {
            "🟢"
        } else if regime.regime.contains("Presumido") {
            "🔵"
        } else {
            "🟣"
        };
        lines.push(format!("{} {}", emoji, regime.regime));
        lines.push(sep.clone());
        lines.push(format!("Processos: {}", regime.total));
        lines.push(format!("✅ Concluídos: {} ({:.1}%) {}", regime.completed, rate, status_emoji(rate)));
        lines.push(format!("📈 {} {:.1}%", progress_bar(regime.avg_progress), regime.avg_progress));
        lines.push(format!("⏱️ Média: {:.1} dias", regime.avg_days));
        lines.push(String::new());
    }

    lines.push(sep);
    lines.push(FOOTER.to_string());
    lines.join("\n")
}

pub fn late_processes(data: &[ProcessAlert]) -> String {
    alert_list("⏰ PROCESSOS ATRASADOS", "✅ Nenhum processo em andamento.", data)
}

pub fn stalled_processes(data: &[ProcessAlert]) -> String {
    alert_list("🛑 EMPRESAS PARADAS (0%)", "✅ Nenhuma empresa parada!", data)
}

fn alert_list(title: &str, empty: &str, data: &[ProcessAlert]) -> String {
    let sep = separator();
    let mut lines = vec![box_title(title), String::new()];

    if data.is_empty() {
        lines.push(empty.to_string());
    }

    for (i, alert) in data.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, truncate(&alert.company, 30)));
        if let Some(tax_id) = &alert.tax_id {
            lines.push(format!("   CNPJ: {}", tax_id));
        }
        lines.push(format!("   Regime: {}", alert.regime));
        lines.push(format!(
            "   ⏱️ {} dias | {} {:.0}%",
            alert.elapsed_days,
            status_emoji(alert.completion_pct),
            alert.completion_pct
        ));
        if let Some(question) = &alert.waiting_on {
            lines.push(format!("   ❓ Aguardando: {}", truncate(question, 40)));
        }
        lines.push(String::new());
    }

    lines.push(sep);
    lines.push(FOOTER.to_string());
    lines.join("\n")
}

pub fn bottlenecks(data: &[Bottleneck]) -> String {
    let sep = separator();
    let total: i64 = data.iter().map(|b| b.pending).sum();
    let mut lines = vec![
        "🚧 GARGALOS POR TIPO DE PASSO".to_string(),
        sep.clone(),
        format!("Passos pendentes (top {}): {}", data.len(), total),
        String::new(),
    ];

    for (i, item) in data.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, truncate(&item.step_name, 35)));
        lines.push(format!("   Quantidade: {} empresas", item.pending));
        lines.push(String::new());
    }

    lines.push(sep);
    lines.push(FOOTER.to_string());
    lines.join("\n")
}

pub fn pending_questions(data: &[PendingQuestion]) -> String {
    let sep = separator();
    let total: i64 = data.iter().map(|q| q.pending).sum();
    let mut lines = vec![
        "❓ DESDOBRAMENTOS NÃO RESPONDIDOS".to_string(),
        sep.clone(),
        format!("Total Pendentes: {}", total),
        String::new(),
    ];

    for (i, item) in data.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, truncate(&item.question, 50)));
        lines.push(format!("   Empresas: {}", item.pending));
        lines.push(String::new());
    }

    lines.push(sep);
    lines.push(FOOTER.to_string());
    lines.join("\n")
}

pub fn company_matches(term: &str, matches: &[CompanyMatch]) -> String {
    if matches.is_empty() {
        return format!(
            "❌ Nenhuma empresa encontrada com '{}'\n\nDigite outro termo ou 0 para menu",
            term
        );
    }

    let sep = separator();
    let mut lines = vec![format!("🔎 Resultado da busca: '{}'", term), sep.clone(), String::new()];

    for company in matches {
        lines.push(format!("🏢 {}", company.name));
        if let Some(tax_id) = &company.tax_id {
            lines.push(format!("   CNPJ: {}", tax_id));
        }
        if let Some(regime) = &company.regime {
            lines.push(format!("   Regime: {}", regime));
        }
        if company.processes.is_empty() {
            lines.push("   Nenhum processo sincronizado".to_string());
        }
        for process in &company.processes {
            lines.push(format!(
                "   📄 #{} {} ({})",
                process.external_id,
                truncate(&process.name, 30),
                process.competence
            ));
            lines.push(format!(
                "      {} {:.0}% | {} | {} dias",
                progress_bar(process.completion_pct),
                process.completion_pct,
                process.status,
                process.elapsed_days
            ));
        }
        lines.push(String::new());
    }

    lines.push(sep);
    lines.push(FOOTER.to_string());
    lines.join("\n")
}

pub fn ask_company_name() -> String {
    "🔎 Digite o nome da empresa:".to_string()
}

pub fn ask_tax_id() -> String {
    "🔎 Digite o CNPJ da empresa:".to_string()
}

pub fn invalid_command(text: &str) -> String {
    format!(
        "❌ Comando não reconhecido: '{}'\n\nDigite 0 para ver o menu ou 23 para ajuda",
        text
    )
}

pub fn processing_error(message: &str) -> String {
    format!(
        "❌ Erro ao processar comando:\n{}\n\nDigite 0 para voltar ao menu",
        message
    )
}

pub fn not_authorized() -> String {
    "🔒 Número não autorizado a consultar os processos.".to_string()
}
