use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::cons::provider_cons::{LLMProvider, WireFormat};
use crate::error::{CoreError, CoreResult};

use super::claude::ClaudeClient;
use super::openai::OpenAiClient;
use super::settings::ProviderSettings;
use super::transport::{ChatTransport, HttpTransport};
pub use super::provider_base::{CodeAnalysis, ConversationHistory, Message, ProviderClient};

#[derive(Debug, Clone)]
pub enum AnyProviderClient {
    Claude(ClaudeClient),
    OpenAI(OpenAiClient),
}

impl ProviderClient for AnyProviderClient {
    fn kind(&self) -> LLMProvider {
        match self {
            AnyProviderClient::Claude(c) => c.kind(),
            AnyProviderClient::OpenAI(c) => c.kind(),
        }
    }

    fn settings(&self) -> &ProviderSettings {
        match self {
            AnyProviderClient::Claude(c) => c.settings(),
            AnyProviderClient::OpenAI(c) => c.settings(),
        }
    }

    fn history(&self) -> &ConversationHistory {
        match self {
            AnyProviderClient::Claude(c) => c.history(),
            AnyProviderClient::OpenAI(c) => c.history(),
        }
    }

    fn reset_history(&mut self) {
        match self {
            AnyProviderClient::Claude(c) => c.reset_history(),
            AnyProviderClient::OpenAI(c) => c.reset_history(),
        }
    }

    async fn send(&mut self, message: &str, context: &[Message]) -> CoreResult<String> {
        match self {
            AnyProviderClient::Claude(c) => c.send(message, context).await,
            AnyProviderClient::OpenAI(c) => c.send(message, context).await,
        }
    }
}

/// Builds a provider instance for the config entry `name`, talking HTTP.
///
/// Never touches the network: the HTTP client is only constructed here.
pub fn configure_provider(name: &str, config: &ProviderConfig) -> CoreResult<AnyProviderClient> {
    let transport: Arc<dyn ChatTransport> = Arc::new(HttpTransport::new()?);
    configure_with_transport(name, config, transport)
}

/// Same as [`configure_provider`] with a caller-supplied transport.
pub fn configure_with_transport(
    name: &str,
    config: &ProviderConfig,
    transport: Arc<dyn ChatTransport>,
) -> CoreResult<AnyProviderClient> {
    let brand = config.brand_or(name);
    let kind = LLMProvider::from_name(brand).ok_or_else(|| {
        CoreError::Configuration(format!("{}: unknown provider brand '{}'", name, brand))
    })?;

    match kind.wire_format() {
        WireFormat::AnthropicMessages => Ok(AnyProviderClient::Claude(ClaudeClient::configure(
            config, transport,
        )?)),
        WireFormat::ChatCompletions => Ok(AnyProviderClient::OpenAI(OpenAiClient::configure(
            kind, config, transport,
        )?)),
    }
}
