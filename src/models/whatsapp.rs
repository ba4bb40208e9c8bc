use serde::{Deserialize, Serialize};

/// Payload do webhook do WhatsApp Cloud API
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WhatsAppWebhook {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct IncomingMessage {
    pub from: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<MessageText>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MessageText {
    #[serde(default)]
    pub body: String,
}

impl WhatsAppWebhook {
    /// (telefone, texto) de todas as mensagens de texto do payload
    pub fn text_messages(&self) -> Vec<(String, String)> {
        self.entry
            .iter()
            .flat_map(|entry| entry.changes.iter())
            .flat_map(|change| change.value.messages.iter())
            .filter_map(|message| {
                let body = message.text.as_ref()?.body.trim();
                if body.is_empty() {
                    None
                } else {
                    Some((message.from.clone(), body.to_string()))
                }
            })
            .collect()
    }
}

/// Query do handshake de verificação (`hub.mode`, `hub.verify_token`, `hub.challenge`)
#[derive(Debug, Deserialize, Default)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatReply {
    pub to: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_messages() {
        let payload: WhatsAppWebhook = serde_json::from_value(json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": [
                            {"from": "5511999990000", "type": "text", "text": {"body": " 1 "}},
                            {"from": "5511999990000", "type": "image"}
                        ]
                    }
                }]
            }]
        }))
        .unwrap();

        assert_eq!(
            payload.text_messages(),
            vec![("5511999990000".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn test_status_only_payload_has_no_messages() {
        let payload: WhatsAppWebhook = serde_json::from_value(json!({
            "entry": [{"changes": [{"value": {"statuses": [{"id": "x"}]}}]}]
        }))
        .unwrap();
        assert!(payload.text_messages().is_empty());
    }
}
