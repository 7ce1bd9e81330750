use thiserror::Error;

/// Errors surfaced by the provider, execution and scanning core.
///
/// Configuration and request-validation errors are returned synchronously.
/// Backend errors are also delivered inside `ChatEvent`s, so callers can tell
/// a retryable condition from a fatal one without reading the message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network timeout, connection failure, rate limit or overload.
    #[error("Transient backend error: {0}")]
    TransientBackend(String),

    /// Bad credentials, malformed request, exhausted quota, unparseable reply.
    #[error("Backend error: {0}")]
    FatalBackend(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Local filesystem failure, e.g. a scratch file that can't be written.
    #[error("I/O error: {0}")]
    Io(String),
}

impl CoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::TransientBackend(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
