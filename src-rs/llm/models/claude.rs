use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::cons::provider_cons::{LLMProvider, ANTHROPIC_VERSION, DEFAULT_CLAUDE_MAX_TOKENS};
use crate::error::{CoreError, CoreResult};
use crate::llm::models::provider_base::{
    outbound_messages, ConversationHistory, Message, ProviderClient, Role,
};
use crate::llm::models::settings::ProviderSettings;
use crate::llm::models::transport::{classify_failure, ChatTransport, TransportRequest};

/// Client for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct ClaudeClient {
    settings: ProviderSettings,
    anthropic_version: String,
    history: ConversationHistory,
    transport: Arc<dyn ChatTransport>,
}

impl ClaudeClient {
    pub fn configure(config: &ProviderConfig, transport: Arc<dyn ChatTransport>) -> CoreResult<Self> {
        let settings = ProviderSettings::from_config(LLMProvider::Claude, config)?;
        let anthropic_version = config
            .extra_str("anthropic_version")
            .unwrap_or(ANTHROPIC_VERSION)
            .to_string();
        log::debug!(
            "Configured claude client: model={}, endpoint={}",
            settings.model,
            settings.endpoint
        );
        Ok(Self {
            settings,
            anthropic_version,
            history: ConversationHistory::new(),
            transport,
        })
    }

    async fn chat(&self, messages: Vec<Message>) -> CoreResult<String> {
        let request = TransportRequest {
            url: messages_url(&self.settings.endpoint),
            headers: vec![
                ("x-api-key".to_string(), self.settings.api_key.clone()),
                ("anthropic-version".to_string(), self.anthropic_version.clone()),
            ],
            body: build_messages_request_body(&self.settings, messages),
        };

        let response = self.transport.post_json(&request).await?;
        if !response.is_success() {
            let err = classify_failure(response.status, &response.body);
            log::error!("Claude API error: {}", err);
            return Err(err);
        }

        reply_text_from_messages_response(&response.json()?)
    }
}

impl ProviderClient for ClaudeClient {
    fn kind(&self) -> LLMProvider {
        LLMProvider::Claude
    }

    fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn history(&self) -> &ConversationHistory {
        &self.history
    }

    fn reset_history(&mut self) {
        self.history.clear();
    }

    async fn send(&mut self, message: &str, context: &[Message]) -> CoreResult<String> {
        let messages = outbound_messages(self.settings.system_prompt.as_deref(), context, message);
        let reply = self.chat(messages).await?;
        self.history.record_exchange(message, &reply);
        Ok(reply)
    }
}

pub(crate) fn messages_url(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    if base.ends_with("/v1") {
        format!("{}/messages", base)
    } else {
        format!("{}/v1/messages", base)
    }
}

/// System turns go to the top-level `system` field; consecutive turns with
/// the same role are merged into one message of text blocks, since the
/// Messages API expects user and assistant to alternate.
pub(crate) fn build_messages_request_body(settings: &ProviderSettings, messages: Vec<Message>) -> Value {
    let mut anthropic_messages: Vec<Value> = Vec::new();
    let mut system_parts: Vec<String> = Vec::new();

    for msg in messages {
        if msg.role == Role::System {
            system_parts.push(msg.content);
            continue;
        }

        let role = msg.role.as_str();
        if let Some(last) = anthropic_messages.last_mut() {
            if last["role"] == role {
                if !last["content"].is_array() {
                    let text = last["content"].as_str().unwrap_or("").to_string();
                    last["content"] = json!([{ "type": "text", "text": text }]);
                }
                if let Some(blocks) = last["content"].as_array_mut() {
                    blocks.push(json!({ "type": "text", "text": msg.content }));
                }
                continue;
            }
        }
        anthropic_messages.push(json!({
            "role": role,
            "content": msg.content
        }));
    }

    let mut request_body = json!({
        "model": settings.model,
        "messages": anthropic_messages,
        "max_tokens": settings.max_tokens.unwrap_or(DEFAULT_CLAUDE_MAX_TOKENS),
        // The Messages API accepts 0.0..=1.0 only.
        "temperature": settings.temperature.min(1.0),
    });

    if !system_parts.is_empty() {
        request_body["system"] = json!(system_parts.join("\n"));
    }
    request_body
}

pub(crate) fn reply_text_from_messages_response(v: &Value) -> CoreResult<String> {
    let blocks = v
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| CoreError::FatalBackend("Messages response has no content".to_string()))?;

    let texts: Vec<&str> = blocks
        .iter()
        .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
        .collect();

    if texts.is_empty() {
        return Err(CoreError::FatalBackend(
            "Messages response contained no text block".to_string(),
        ));
    }
    Ok(texts.concat())
}
