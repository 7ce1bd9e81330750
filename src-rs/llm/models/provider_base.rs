use serde::{Deserialize, Serialize};

use crate::cons::provider_cons::LLMProvider;
use crate::error::CoreResult;
use crate::llm::models::settings::ProviderSettings;
use crate::llm::prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Append-only record of the exchanges made through one provider instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Records one completed round trip: the user turn, then the reply.
    pub(crate) fn record_exchange(&mut self, user: &str, reply: &str) {
        self.messages.push(Message::user(user));
        self.messages.push(Message::assistant(reply));
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeAnalysis {
    pub analysis: String,
    pub suggestions: Vec<String>,
    pub issues: Vec<String>,
}

/// Outbound turn order shared by every backend: system prompt, caller
/// context, then the new user message.
pub(crate) fn outbound_messages(
    system_prompt: Option<&str>,
    context: &[Message],
    message: &str,
) -> Vec<Message> {
    let mut out = Vec::with_capacity(context.len() + 2);
    if let Some(prompt) = system_prompt {
        out.push(Message::system(prompt));
    }
    out.extend_from_slice(context);
    out.push(Message::user(message));
    out
}

/// Capability set every AI backend implements.
#[allow(async_fn_in_trait)]
pub trait ProviderClient: Send + Sync {
    fn kind(&self) -> LLMProvider;

    fn settings(&self) -> &ProviderSettings;

    fn history(&self) -> &ConversationHistory;

    fn reset_history(&mut self);

    /// Sends `context` followed by `message` and records the exchange on success.
    async fn send(&mut self, message: &str, context: &[Message]) -> CoreResult<String>;

    async fn analyze_code(&mut self, code: &str, language: Option<&str>) -> CoreResult<CodeAnalysis> {
        let prompt = prompts::analysis_prompt(code, language);
        let reply = self.send(&prompt, &[]).await?;
        Ok(prompts::parse_analysis(&reply))
    }

    async fn generate_code(&mut self, prompt: &str, language: Option<&str>) -> CoreResult<String> {
        let full_prompt = prompts::generation_prompt(prompt, language.unwrap_or(prompts::DEFAULT_LANGUAGE));
        let reply = self.send(&full_prompt, &[]).await?;
        Ok(prompts::extract_code_block(&reply).unwrap_or(reply))
    }
}
