use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::cons::provider_cons::LLMProvider;
use crate::error::{CoreError, CoreResult};
use crate::llm::models::provider_base::{
    outbound_messages, ConversationHistory, Message, ProviderClient,
};
use crate::llm::models::settings::ProviderSettings;
use crate::llm::models::transport::{
    classify_failure, ChatTransport, TransportRequest, TransportResponse,
};

/// Client for Chat Completions compatible backends (OpenAI, DeepSeek, Qwen, ZhipuAI).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    kind: LLMProvider,
    settings: ProviderSettings,
    history: ConversationHistory,
    transport: Arc<dyn ChatTransport>,
}

impl OpenAiClient {
    pub fn configure(
        kind: LLMProvider,
        config: &ProviderConfig,
        transport: Arc<dyn ChatTransport>,
    ) -> CoreResult<Self> {
        let settings = ProviderSettings::from_config(kind, config)?;
        log::debug!(
            "Configured {} client: model={}, endpoint={}",
            kind,
            settings.model,
            settings.endpoint
        );
        Ok(Self {
            kind,
            settings,
            history: ConversationHistory::new(),
            transport,
        })
    }

    async fn chat(&self, messages: Vec<Message>) -> CoreResult<String> {
        let request_body = build_chat_completions_request_body(&self.settings, messages);
        let url_candidates = chat_completions_url_candidates(&self.settings.endpoint);

        let response = send_first_successful_chat_completions_request(
            self.transport.as_ref(),
            &url_candidates,
            &self.settings.api_key,
            &request_body,
        )
        .await?;

        if !response.is_success() {
            let err = classify_failure(response.status, &response.body);
            log::error!("{} API error: {}", self.kind, err);
            return Err(err);
        }

        reply_text_from_chat_completion(&response.json()?)
    }
}

impl ProviderClient for OpenAiClient {
    fn kind(&self) -> LLMProvider {
        self.kind
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

pub(crate) fn build_chat_completions_request_body(
    settings: &ProviderSettings,
    messages: Vec<Message>,
) -> Value {
    let converted_messages: Vec<Value> = messages
        .into_iter()
        .map(|msg| {
            json!({
                "role": msg.role.as_str(),
                "content": msg.content,
            })
        })
        .collect();

    let mut request_body = json!({
        "model": settings.model,
        "messages": converted_messages,
        "temperature": settings.temperature,
        "stream": false,
    });
    if let Some(max_tokens) = settings.max_tokens {
        request_body["max_tokens"] = json!(max_tokens);
    }
    request_body
}

pub(crate) fn reply_text_from_chat_completion(v: &Value) -> CoreResult<String> {
    v.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            CoreError::FatalBackend("Chat completion contained no message content".to_string())
        })
}

pub(crate) fn chat_completions_url_candidates(api_base: &str) -> Vec<String> {
    let base = api_base.trim_end_matches('/');
    let mut out = Vec::new();
    out.push(format!("{}/chat/completions", base));
    if !base.ends_with("/v1") {
        out.push(format!("{}/v1/chat/completions", base));
    }
    out
}

async fn send_first_successful_chat_completions_request(
    transport: &dyn ChatTransport,
    url_candidates: &[String],
    api_key: &str,
    request_body: &Value,
) -> CoreResult<TransportResponse> {
    let mut last: Option<TransportResponse> = None;

    for url in url_candidates {
        let request = TransportRequest {
            url: url.clone(),
            headers: vec![("Authorization".to_string(), format!("Bearer {}", api_key))],
            body: request_body.clone(),
        };
        let response = transport.post_json(&request).await?;
        if response.status == 404 {
            log::debug!("Chat completions endpoint not found: {}", url);
            last = Some(response);
            continue;
        }
        return Ok(response);
    }

    last.ok_or_else(|| CoreError::FatalBackend("No chat completions endpoint to try".to_string()))
}
