//! Tipos do payload da API Acessórias
//!
//! A API é pouco consistente: números chegam como string ("75,5%"), listas de
//! passos às vezes vêm embrulhadas em outra lista e `Automacao` muda de forma
//! conforme o tipo do passo. Todos os campos são opcionais aqui; a validação
//! fica na camada de transformação.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Processo como retornado por `/processes/ListAll/` e `/processes/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessRecord {
    #[serde(rename = "ProcID", default, deserialize_with = "de::loose_i64")]
    pub id: Option<i64>,

    #[serde(rename = "ProcNome", default, deserialize_with = "de::loose_string")]
    pub name: Option<String>,

    #[serde(rename = "ProcTitulo", default, deserialize_with = "de::loose_string")]
    pub title: Option<String>,

    #[serde(rename = "ProcStatus", default, deserialize_with = "de::loose_string")]
    pub status: Option<String>,

    #[serde(rename = "ProcPorcentagem", default, deserialize_with = "de::loose_f64")]
    pub percentage: Option<f64>,

    #[serde(rename = "ProcCompetencia", default, deserialize_with = "de::loose_string")]
    pub competence: Option<String>,

    #[serde(rename = "ProcInicio", alias = "ProcDataInicio", default, deserialize_with = "de::loose_string")]
    pub started_at: Option<String>,

    #[serde(rename = "ProcConclusao", default, deserialize_with = "de::loose_string")]
    pub finished_at: Option<String>,

    #[serde(rename = "ProcDiasCorridos", default, deserialize_with = "de::loose_i64")]
    pub elapsed_days: Option<i64>,

    #[serde(rename = "ProcGestor", default, deserialize_with = "de::loose_string")]
    pub manager: Option<String>,

    #[serde(rename = "ProcDepartamento", default, deserialize_with = "de::loose_string")]
    pub department: Option<String>,

    #[serde(rename = "EmpID", default, deserialize_with = "de::loose_i64")]
    pub company_id: Option<i64>,

    #[serde(rename = "EmpNome", default, deserialize_with = "de::loose_string")]
    pub company_name: Option<String>,

    #[serde(rename = "EmpCNPJ", default, deserialize_with = "de::loose_string")]
    pub company_tax_id: Option<String>,

    #[serde(rename = "DtLastDH", default, deserialize_with = "de::loose_string")]
    pub last_change: Option<String>,

    #[serde(rename = "ProcPassos", default)]
    pub steps: Option<StepList>,
}

impl ProcessRecord {
    /// Passos de primeiro nível, já sem o embrulho extra de lista
    pub fn steps(&self) -> &[StepRecord] {
        self.steps.as_ref().map(StepList::as_slice).unwrap_or(&[])
    }
}

/// `ProcPassos` chega como lista de passos ou como lista contendo uma lista
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepList {
    Nested(Vec<Vec<StepRecord>>),
    Flat(Vec<StepRecord>),
}

impl Default for StepList {
    fn default() -> Self {
        StepList::Flat(Vec::new())
    }
}

impl StepList {
    /// Desembrulha exatamente um nível quando a lista vem aninhada
    pub fn as_slice(&self) -> &[StepRecord] {
        match self {
            StepList::Flat(steps) => steps,
            StepList::Nested(lists) => lists.first().map(Vec::as_slice).unwrap_or(&[]),
        }
    }
}

/// Passo de um processo (atômico, sub processo ou desdobramento)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(rename = "ID", alias = "PassoID", default, deserialize_with = "de::loose_i64")]
    pub id: Option<i64>,

    #[serde(rename = "Tipo", default, deserialize_with = "de::loose_string")]
    pub kind: Option<String>,

    #[serde(rename = "Nome", default, deserialize_with = "de::loose_string")]
    pub name: Option<String>,

    #[serde(rename = "Status", default, deserialize_with = "de::loose_string")]
    pub status: Option<String>,

    #[serde(rename = "Descricao", default, deserialize_with = "de::loose_string")]
    pub description: Option<String>,

    /// Resposta explícita de um desdobramento, quando a API informa
    #[serde(rename = "Resposta", default, deserialize_with = "de::loose_string")]
    pub answer: Option<String>,

    #[serde(rename = "Automacao", default)]
    pub automation: Option<Automation>,

    /// Filhos de um sub processo
    #[serde(rename = "ProcPassos", default)]
    pub children: Option<StepList>,
}

impl StepRecord {
    pub fn children(&self) -> &[StepRecord] {
        self.children.as_ref().map(StepList::as_slice).unwrap_or(&[])
    }
}

/// `Automacao`: lista de escolhas em desdobramentos, objeto de regras nos demais passos
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Automation {
    Choices(Vec<ChoiceRecord>),
    Rules(AutomationRules),
    Other(Value),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutomationRules {
    #[serde(rename = "Bloqueante", default, deserialize_with = "de::loose_string")]
    pub blocking: Option<String>,

    #[serde(rename = "Entrega", default)]
    pub delivery: Option<Delivery>,

    #[serde(rename = "Quando", default, deserialize_with = "de::loose_string")]
    pub when: Option<String>,

    #[serde(rename = "Para", default, deserialize_with = "de::loose_string")]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(rename = "Tipo", default, deserialize_with = "de::loose_string")]
    pub kind: Option<String>,

    #[serde(rename = "Nome", default, deserialize_with = "de::loose_string")]
    pub name: Option<String>,

    #[serde(rename = "Responsavel", default, deserialize_with = "de::loose_string")]
    pub owner: Option<String>,

    #[serde(rename = "Prazo", default, deserialize_with = "de::loose_string")]
    pub deadline: Option<String>,

    #[serde(rename = "Previsao", default, deserialize_with = "de::loose_string")]
    pub forecast: Option<String>,

    #[serde(rename = "Criacao", default, deserialize_with = "de::loose_string")]
    pub created: Option<String>,
}

/// Uma opção de resposta de desdobramento
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceRecord {
    #[serde(rename = "Nome", default, deserialize_with = "de::loose_string")]
    pub name: Option<String>,

    #[serde(rename = "Acao", default)]
    pub action: Option<ActionRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(rename = "Tipo", default, deserialize_with = "de::loose_string")]
    pub kind: Option<String>,

    #[serde(rename = "Nome", default, deserialize_with = "de::loose_string")]
    pub name: Option<String>,
}

/// Deserializers tolerantes (string ou número, vazio vira `None`)
pub(crate) mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(if b { "Sim" } else { "Não" }.to_string()),
            Some(other) => Some(other.to_string()),
        })
    }

    pub fn loose_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok().map(|f| f as i64))
            }
            _ => None,
        })
    }

    pub fn loose_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s
                .trim()
                .trim_end_matches('%')
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .ok(),
            _ => None,
        }
        .filter(|v| v.is_finite()))
    }
}
