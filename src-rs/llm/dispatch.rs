use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::{CoreError, CoreResult};
use crate::llm::models::provider_base::{CodeAnalysis, Message, ProviderClient};
use crate::llm::models::provider_handle::AnyProviderClient;
use crate::session::id::generate_request_id;

/// A provider instance shared between the registry and in-flight tasks.
/// The mutex serializes sends on one instance, keeping history appends in
/// call order.
pub type SharedProvider = Arc<Mutex<AnyProviderClient>>;

#[derive(Debug, Clone)]
pub enum ChatRequest {
    Send {
        message: String,
        context: Vec<Message>,
    },
    AnalyzeCode {
        code: String,
        language: Option<String>,
    },
    GenerateCode {
        prompt: String,
        language: Option<String>,
    },
}

impl ChatRequest {
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            ChatRequest::Send { message, .. } if message.trim().is_empty() => {
                Err(CoreError::InvalidRequest("message is empty".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    Text(String),
    Analysis(CodeAnalysis),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStatus {
    Success,
    Transient,
    Fatal,
}

/// Result of one dispatched request, delivered on the dispatcher's channel.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub request_id: String,
    pub provider: String,
    pub outcome: CoreResult<ChatReply>,
}

impl ChatEvent {
    pub fn status(&self) -> ChatStatus {
        match &self.outcome {
            Ok(_) => ChatStatus::Success,
            Err(e) if e.is_retryable() => ChatStatus::Transient,
            Err(_) => ChatStatus::Fatal,
        }
    }
}

/// Runs provider calls off the caller's task and reports back over an
/// unbounded channel.
#[derive(Debug, Clone)]
pub struct ChatDispatcher {
    tx: mpsc::UnboundedSender<ChatEvent>,
}

impl ChatDispatcher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Spawns the request and returns its id right away. Must be called from
    /// within a tokio runtime. Malformed requests are rejected here and never
    /// produce an event.
    pub fn dispatch(
        &self,
        provider_name: &str,
        provider: SharedProvider,
        request: ChatRequest,
    ) -> CoreResult<(String, JoinHandle<()>)> {
        request.validate()?;

        let request_id = generate_request_id();
        let tx = self.tx.clone();
        let event_request_id = request_id.clone();
        let provider_name = provider_name.to_string();

        log::debug!("Dispatching {} to provider '{}'", request_id, provider_name);

        let task = tokio::spawn(async move {
            let outcome = {
                let mut client = provider.lock().await;
                run_request(&mut client, request).await
            };
            if let Err(e) = &outcome {
                log::warn!("Request {} on '{}' failed: {}", event_request_id, provider_name, e);
            }
            let event = ChatEvent {
                request_id: event_request_id,
                provider: provider_name,
                outcome,
            };
            if tx.send(event).is_err() {
                log::debug!("Chat event receiver dropped; reply discarded");
            }
        });

        Ok((request_id, task))
    }
}

async fn run_request(client: &mut AnyProviderClient, request: ChatRequest) -> CoreResult<ChatReply> {
    match request {
        ChatRequest::Send { message, context } => {
            client.send(&message, &context).await.map(ChatReply::Text)
        }
        ChatRequest::AnalyzeCode { code, language } => client
            .analyze_code(&code, language.as_deref())
            .await
            .map(ChatReply::Analysis),
        ChatRequest::GenerateCode { prompt, language } => client
            .generate_code(&prompt, language.as_deref())
            .await
            .map(ChatReply::Text),
    }
}
