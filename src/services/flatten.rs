//! Achatamento do payload da Acessórias
//!
//! Processo → passos → (sub processo → passos)* → desdobramentos viram linhas
//! relacionais. A árvore é percorrida em profundidade com um acumulador de
//! ordinais: um sub processo ocupa uma linha e seus filhos vêm logo em
//! seguida, com ordinais contínuos.

use acessorias::{Automation, ProcessRecord, StepRecord};
use thiserror::Error;

use crate::models::{
    content_hash, CompanyRef, FlatProcess, FlatQuestion, FlatStep, ProcessHeader, ProcessStatus,
    StepKind,
};
use crate::utils::normalization::{
    competence_from_date, normalize_competence, normalize_string, parse_date,
};
use crate::utils::string_utils::truncate_chars;

/// Tamanho máximo do nome da empresa dentro do código derivado
const COMPANY_CODE_NAME_CHARS: usize = 50;

#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("registro sem ProcID")]
    MissingProcessId,
}

/// Contexto da listagem de onde o registro veio
#[derive(Debug, Clone, Copy)]
pub struct RegimeContext<'a> {
    pub regime: &'a str,
    pub default_competence: &'a str,
}

/// Achata um processo completo (detalhe) em cabeçalho, passos e desdobramentos
pub fn flatten_process(record: &ProcessRecord, ctx: RegimeContext<'_>) -> Result<FlatProcess, TransformError> {
    let external_id = record.id.ok_or(TransformError::MissingProcessId)?;

    let mut ordinal = 0i64;
    let mut steps = Vec::new();
    let mut questions = Vec::new();
    walk_steps(record.steps(), &mut ordinal, &mut steps, &mut questions);

    let total_steps = steps.len() as i64;
    let done_steps = steps.iter().filter(|s| s.done).count() as i64;

    let completion_pct = record
        .percentage
        .map(|p| p.clamp(0.0, 100.0))
        .unwrap_or_else(|| computed_percentage(done_steps, total_steps));

    let status = record
        .status
        .as_deref()
        .and_then(ProcessStatus::from_source_text)
        .unwrap_or_else(|| ProcessStatus::from_counts(done_steps, total_steps));

    let competence = record
        .competence
        .as_deref()
        .and_then(normalize_competence)
        .or_else(|| record.started_at.as_deref().and_then(competence_from_date))
        .unwrap_or_else(|| ctx.default_competence.to_string());

    let header = ProcessHeader {
        external_id,
        name: record.name.clone().unwrap_or_else(|| "Sem nome".to_string()),
        title: record.title.clone(),
        competence,
        status,
        completion_pct,
        total_steps,
        done_steps,
        elapsed_days: record.elapsed_days.unwrap_or(0).max(0),
        started_on: record.started_at.as_deref().and_then(parse_date),
        finished_on: record.finished_at.as_deref().and_then(parse_date),
        tax_regime: ctx.regime.to_string(),
        manager: record.manager.clone(),
        department: record.department.clone(),
        content_hash: content_hash(status, completion_pct, done_steps, total_steps),
    };

    Ok(FlatProcess {
        header,
        company: company_ref(record, ctx.regime),
        steps,
        questions,
    })
}

/// Código derivado `{regime}_{primeiros 50 caracteres do nome}`
pub fn company_code(regime: &str, company_name: &str) -> String {
    format!(
        "{}_{}",
        regime,
        truncate_chars(company_name.trim(), COMPANY_CODE_NAME_CHARS)
    )
}

fn company_ref(record: &ProcessRecord, regime: &str) -> CompanyRef {
    let name = record
        .company_name
        .clone()
        .unwrap_or_else(|| match record.company_id {
            Some(id) => format!("Empresa {}", id),
            None => "Empresa sem nome".to_string(),
        });

    CompanyRef {
        code: company_code(regime, &name),
        name,
        tax_id: record.company_tax_id.clone(),
        external_id: record.company_id,
        tax_regime: regime.to_string(),
    }
}

fn computed_percentage(done: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((done as f64 / total as f64) * 10000.0).round() / 100.0
}

/// Percorre a árvore de passos acumulando linhas
fn walk_steps(
    steps: &[StepRecord],
    ordinal: &mut i64,
    out_steps: &mut Vec<FlatStep>,
    out_questions: &mut Vec<FlatQuestion>,
) {
    for step in steps {
        *ordinal += 1;
        let current = *ordinal;
        let kind = StepKind::from_source_text(step.kind.as_deref());

        out_steps.push(flat_step(step, kind, current));

        match kind {
            StepKind::BranchQuestion => {
                let question_ordinal = out_questions.len() as i64 + 1;
                out_questions.push(flat_question(step, current, question_ordinal));
            }
            StepKind::SubProcess => walk_steps(step.children(), ordinal, out_steps, out_questions),
            StepKind::Atomic => {}
        }
    }
}

fn is_done(status: Option<&str>) -> bool {
    match status.map(normalize_string) {
        Some(s) => matches!(s.as_str(), "ok" | "concluido" | "concluida" | "feito" | "finalizado"),
        None => false,
    }
}

fn is_truthy(value: Option<&str>) -> bool {
    value
        .map(normalize_string)
        .map(|v| matches!(v.as_str(), "sim" | "s" | "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn flat_step(step: &StepRecord, kind: StepKind, ordinal: i64) -> FlatStep {
    let rules = match &step.automation {
        Some(Automation::Rules(rules)) => Some(rules),
        _ => None,
    };
    let delivery = rules.and_then(|r| r.delivery.as_ref());

    FlatStep {
        ordinal,
        external_id: step.id,
        kind,
        raw_kind: step.kind.clone(),
        name: step.name.clone().unwrap_or_else(|| format!("Passo {}", ordinal)),
        status: step.status.clone(),
        done: is_done(step.status.as_deref()),
        description: step.description.clone(),
        owner: delivery.and_then(|d| d.owner.clone()),
        blocking: is_truthy(rules.and_then(|r| r.blocking.as_deref())),
        delivery_kind: delivery.and_then(|d| d.kind.clone()),
        delivery_name: delivery.and_then(|d| d.name.clone()),
        deadline: delivery.and_then(|d| d.deadline.clone().or_else(|| d.forecast.clone())),
    }
}

/// Desdobramento: pergunta, opções e a resposta escolhida
///
/// Sem `Resposta` explícita, a resposta só é conhecida quando o passo está OK
/// e existe exatamente uma opção.
fn flat_question(step: &StepRecord, step_ordinal: i64, ordinal: i64) -> FlatQuestion {
    let choices = match &step.automation {
        Some(Automation::Choices(choices)) => choices.as_slice(),
        _ => &[],
    };
    let choice_names: Vec<String> = choices.iter().filter_map(|c| c.name.clone()).collect();
    let done = is_done(step.status.as_deref());

    let selected = match &step.answer {
        Some(answer) => choices
            .iter()
            .find(|c| c.name.as_deref().map(normalize_string) == Some(normalize_string(answer)))
            .map(|c| (answer.clone(), c.action.as_ref()))
            .or(Some((answer.clone(), None))),
        None if done && choices.len() == 1 => choices[0]
            .name
            .clone()
            .map(|name| (name, choices[0].action.as_ref())),
        None => None,
    };

    let (selected_answer, action) = match selected {
        Some((answer, action)) => (Some(answer), action),
        None => (None, None),
    };

    FlatQuestion {
        ordinal,
        step_ordinal,
        step_external_id: step.id,
        question: step.name.clone().unwrap_or_else(|| "Desdobramento".to_string()),
        status: step.status.clone(),
        choices: choice_names,
        answered: selected_answer.is_some() || done,
        selected_answer,
        action_kind: action.and_then(|a| a.kind.clone()),
        action_name: action.and_then(|a| a.name.clone()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};

    pub(crate) const CTX: RegimeContext<'static> = RegimeContext {
        regime: "SimplesNacional",
        default_competence: "10/2025",
    };

    pub(crate) fn record(value: Value) -> ProcessRecord {
        serde_json::from_value(value).unwrap()
    }

    /// Processo 501 do exemplo: 4 passos, 2 concluídos, 50%
    pub(crate) fn process_501(done: usize, percentage: &str) -> ProcessRecord {
        let steps: Vec<Value> = (1..=4)
            .map(|i| {
                json!({
                    "Tipo": "Passo",
                    "Nome": format!("Passo {}", i),
                    "Status": if i <= done { "OK" } else { "Pendente" }
                })
            })
            .collect();

        record(json!({
            "ProcID": 501,
            "ProcNome": "Simples Nacional — Mensal",
            "ProcStatus": "Em andamento",
            "ProcPorcentagem": percentage,
            "ProcCompetencia": "10/2025",
            "EmpID": 77,
            "EmpNome": "Padaria Central Ltda",
            "EmpCNPJ": "12.345.678/0001-90",
            "ProcPassos": steps
        }))
    }

    #[test]
    fn test_missing_process_id_is_rejected() {
        let result = flatten_process(&record(json!({"ProcNome": "x"})), CTX);
        assert_eq!(result.unwrap_err(), TransformError::MissingProcessId);
    }

    #[test]
    fn test_example_process_501() {
        let flat = flatten_process(&process_501(2, "50%"), CTX).unwrap();

        assert_eq!(flat.header.external_id, 501);
        assert_eq!(flat.header.total_steps, 4);
        assert_eq!(flat.header.done_steps, 2);
        assert_eq!(flat.header.completion_pct, 50.0);
        assert_eq!(flat.header.status, ProcessStatus::InProgress);
        assert_eq!(flat.header.competence, "10/2025");
        assert_eq!(flat.company.code, "SimplesNacional_Padaria Central Ltda");
        assert_eq!(flat.company.tax_id.as_deref(), Some("12.345.678/0001-90"));
        assert!(flat.questions.is_empty());
    }

    #[test]
    fn test_sub_process_children_follow_parent() {
        let flat = flatten_process(
            &record(json!({
                "ProcID": 1,
                "ProcPassos": [
                    {"Tipo": "Passo", "Nome": "Início", "Status": "OK"},
                    {"Tipo": "Sub processo", "Nome": "Folha", "ProcPassos": [
                        {"Tipo": "Passo", "Nome": "Calcular", "Status": "OK"},
                        {"Tipo": "Passo", "Nome": "Conferir"},
                        {"Tipo": "Passo", "Nome": "Enviar"}
                    ]},
                    {"Tipo": "Passo", "Nome": "Fim"}
                ]
            })),
            CTX,
        )
        .unwrap();

        let names: Vec<_> = flat.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Início", "Folha", "Calcular", "Conferir", "Enviar", "Fim"]);

        let ordinals: Vec<_> = flat.steps.iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(flat.steps[1].kind, StepKind::SubProcess);
        assert_eq!(flat.header.total_steps, 6);
        assert_eq!(flat.header.done_steps, 2);
    }

    #[test]
    fn test_single_sub_process_with_three_children() {
        let flat = flatten_process(
            &record(json!({
                "ProcID": 2,
                "ProcPassos": [[
                    {"Tipo": "Subprocesso", "Nome": "Apuração", "ProcPassos": [
                        {"Tipo": "Passo", "Nome": "A"},
                        {"Tipo": "Passo", "Nome": "B"},
                        {"Tipo": "Passo", "Nome": "C"}
                    ]}
                ]]
            })),
            CTX,
        )
        .unwrap();

        assert_eq!(flat.steps.len(), 4);
        assert!(flat.steps.windows(2).all(|w| w[0].ordinal < w[1].ordinal));
    }

    #[test]
    fn test_branch_questions_at_any_depth() {
        let flat = flatten_process(
            &record(json!({
                "ProcID": 3,
                "ProcPassos": [
                    {"ID": 10, "Tipo": "Desdobramento", "Nome": "Houve faturamento?", "Status": "OK",
                     "Automacao": [{"Nome": "Sim", "Acao": {"Tipo": "Processo", "Nome": "Apurar"}}]},
                    {"Tipo": "Sub processo", "Nome": "Obrigações", "ProcPassos": [
                        {"ID": 20, "Tipo": "Desdobramento", "Nome": "Tem funcionários?", "Status": "Pendente",
                         "Automacao": [{"Nome": "Sim"}, {"Nome": "Não"}]}
                    ]}
                ]
            })),
            CTX,
        )
        .unwrap();

        assert_eq!(flat.questions.len(), 2);

        let first = &flat.questions[0];
        assert_eq!(first.ordinal, 1);
        assert_eq!(first.step_ordinal, 1);
        assert_eq!(first.step_external_id, Some(10));
        assert_eq!(first.selected_answer.as_deref(), Some("Sim"));
        assert_eq!(first.action_name.as_deref(), Some("Apurar"));
        assert!(first.answered);

        let nested = &flat.questions[1];
        assert_eq!(nested.step_ordinal, 3);
        assert_eq!(nested.choices, vec!["Sim".to_string(), "Não".to_string()]);
        assert_eq!(nested.selected_answer, None);
        assert!(!nested.answered);

        // desdobramentos também são linhas de passo
        assert_eq!(flat.steps.len(), 3);
        assert_eq!(flat.steps[2].kind, StepKind::BranchQuestion);
    }

    #[test]
    fn test_explicit_answer_picks_matching_action() {
        let flat = flatten_process(
            &record(json!({
                "ProcID": 4,
                "ProcPassos": [
                    {"Tipo": "Desdobramento", "Nome": "Regime?", "Status": "OK", "Resposta": "nao",
                     "Automacao": [{"Nome": "Sim", "Acao": {"Nome": "A"}}, {"Nome": "Não", "Acao": {"Nome": "B"}}]}
                ]
            })),
            CTX,
        )
        .unwrap();

        assert_eq!(flat.questions[0].selected_answer.as_deref(), Some("nao"));
        assert_eq!(flat.questions[0].action_name.as_deref(), Some("B"));
    }

    #[test]
    fn test_step_automation_details() {
        let flat = flatten_process(
            &record(json!({
                "ProcID": 5,
                "ProcPassos": [{
                    "Tipo": "Passo", "Nome": "Enviar DAS", "Status": "Concluído",
                    "Automacao": {"Bloqueante": "Sim", "Entrega": {
                        "Tipo": "Guia", "Nome": "DAS", "Responsavel": "Ana", "Previsao": "20/10/2025"
                    }}
                }]
            })),
            CTX,
        )
        .unwrap();

        let step = &flat.steps[0];
        assert!(step.done);
        assert!(step.blocking);
        assert_eq!(step.owner.as_deref(), Some("Ana"));
        assert_eq!(step.delivery_name.as_deref(), Some("DAS"));
        assert_eq!(step.deadline.as_deref(), Some("20/10/2025"));
        assert_eq!(flat.header.status, ProcessStatus::Completed);
        assert_eq!(flat.header.completion_pct, 100.0);
    }

    #[test]
    fn test_competence_and_defaults() {
        let from_start = flatten_process(
            &record(json!({"ProcID": 6, "ProcInicio": "03/09/2025"})),
            CTX,
        )
        .unwrap();
        assert_eq!(from_start.header.competence, "09/2025");
        assert_eq!(
            from_start.header.started_on,
            chrono::NaiveDate::from_ymd_opt(2025, 9, 3)
        );

        let bare = flatten_process(&record(json!({"ProcID": 7})), CTX).unwrap();
        assert_eq!(bare.header.competence, "10/2025");
        assert_eq!(bare.header.status, ProcessStatus::Pending);
        assert_eq!(bare.header.completion_pct, 0.0);
        assert_eq!(bare.company.name, "Empresa sem nome");
    }

    #[test]
    fn test_company_code_truncates_by_chars() {
        let long_name = "Comércio de Alimentos e Bebidas São João do Nordeste Ltda ME";
        let code = company_code("LucroReal_Servicos", long_name);
        assert_eq!(code.chars().count(), "LucroReal_Servicos_".chars().count() + 50);
    }

    #[test]
    fn test_hash_ignores_metadata() {
        let mut a = process_501(2, "50");
        let flat_a = flatten_process(&a, CTX).unwrap();
        a.manager = Some("Outro gestor".into());
        a.department = Some("Fiscal".into());
        let flat_b = flatten_process(&a, CTX).unwrap();
        assert_eq!(flat_a.header.content_hash, flat_b.header.content_hash);

        let flat_c = flatten_process(&process_501(3, "75"), CTX).unwrap();
        assert_ne!(flat_a.header.content_hash, flat_c.header.content_hash);
    }
}
