pub mod assistant;
pub mod id;
pub mod registry;

pub use assistant::AssistantSession;
pub use id::{generate_request_id, generate_run_id};
pub use registry::ProviderRegistry;
