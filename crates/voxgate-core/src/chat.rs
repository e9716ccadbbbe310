//! Conversation engine client.
//!
//! One round trip per utterance: the engine holds all dialogue state keyed by
//! the session id, so this client only normalizes the reply. No retries;
//! transient failures surface immediately.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::BotConfig;
use crate::error::{response_failure, Error, Result};

/// Fixed apology used when the engine answers with no message fragments.
const EMPTY_REPLY: &str = "I'm sorry, I couldn't process your request.";

/// Normalized engine reply.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationReply {
    pub text: String,
    pub intent: Option<String>,
    pub slots: Option<Value>,
    pub session_state: Option<Value>,
}

#[async_trait]
pub trait ConversationEngine: Send + Sync {
    async fn send(&self, session_id: &str, text: &str) -> Result<ConversationReply>;
}

/// Reqwest-backed client for the managed intent engine.
pub struct HttpConversationEngine {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bot: BotConfig,
}

impl HttpConversationEngine {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        bot: BotConfig,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            bot,
        }
    }
}

#[derive(Debug, Serialize)]
struct RecognizeTextRequest<'a> {
    text: &'a str,
    locale: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeTextResponse {
    #[serde(default)]
    messages: Vec<EngineMessage>,
    #[serde(default)]
    interpretations: Vec<Interpretation>,
    #[serde(rename = "sessionState")]
    session_state: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct EngineMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Interpretation {
    intent: Option<IntentRecord>,
}

#[derive(Debug, Deserialize)]
struct IntentRecord {
    name: Option<String>,
    slots: Option<Value>,
}

/// Space-join the reply fragments and pull intent/slots off the top-ranked
/// interpretation.
fn normalize(resp: RecognizeTextResponse) -> ConversationReply {
    let text = if resp.messages.is_empty() {
        EMPTY_REPLY.to_string()
    } else {
        resp.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let top_intent = resp
        .interpretations
        .into_iter()
        .next()
        .and_then(|interpretation| interpretation.intent);

    let (intent, slots) = match top_intent {
        Some(record) => (record.name, record.slots),
        None => (None, None),
    };

    ConversationReply {
        text,
        intent,
        slots,
        session_state: resp.session_state,
    }
}

#[async_trait]
impl ConversationEngine for HttpConversationEngine {
    async fn send(&self, session_id: &str, text: &str) -> Result<ConversationReply> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("Missing message parameter".into()));
        }
        if session_id.is_empty() {
            return Err(Error::InvalidInput("Missing session identifier".into()));
        }

        let url = format!(
            "{}/v1/bots/{}/aliases/{}/sessions/{}/text",
            self.base_url, self.bot.bot_id, self.bot.alias_id, session_id
        );
        debug!(%session_id, "sending utterance to intent engine");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&RecognizeTextRequest {
                text,
                locale: &self.bot.locale,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(response_failure("intent engine", resp).await);
        }

        let body: RecognizeTextResponse = resp.json().await?;
        Ok(normalize(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> RecognizeTextResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn fragments_are_space_joined_in_order() {
        let reply = normalize(parse(json!({
            "messages": [
                {"content": "You can book a cleaning"},
                {"content": "Would mornings work?"}
            ]
        })));
        assert_eq!(reply.text, "You can book a cleaning Would mornings work?");
    }

    #[test]
    fn empty_reply_gets_fixed_apology() {
        let reply = normalize(parse(json!({"messages": []})));
        assert_eq!(reply.text, EMPTY_REPLY);
        assert!(reply.intent.is_none());
    }

    #[test]
    fn top_interpretation_supplies_intent_and_slots() {
        let reply = normalize(parse(json!({
            "messages": [{"content": "Booked."}],
            "interpretations": [
                {"intent": {"name": "BookAppointment", "slots": {"day": "monday"}}},
                {"intent": {"name": "FallbackIntent"}}
            ],
            "sessionState": {"dialogAction": {"type": "Close"}}
        })));
        assert_eq!(reply.intent.as_deref(), Some("BookAppointment"));
        assert_eq!(reply.slots, Some(json!({"day": "monday"})));
        assert!(reply.session_state.is_some());
    }

    #[test]
    fn missing_intent_record_yields_none() {
        let reply = normalize(parse(json!({
            "messages": [{"content": "Hello"}],
            "interpretations": [{}]
        })));
        assert!(reply.intent.is_none());
        assert!(reply.slots.is_none());
    }
}
