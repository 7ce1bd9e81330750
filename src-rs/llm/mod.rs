pub mod dispatch;
pub mod models;
pub mod prompts;

pub use dispatch::{ChatDispatcher, ChatEvent, ChatReply, ChatRequest, ChatStatus, SharedProvider};
pub use models::provider_base::{CodeAnalysis, ConversationHistory, Message, ProviderClient, Role};
pub use models::provider_handle::{configure_provider, configure_with_transport, AnyProviderClient};
