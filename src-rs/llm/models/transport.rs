use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};

const ERROR_BODY_PREVIEW: usize = 512;

/// One JSON POST towards a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> CoreResult<Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            CoreError::FatalBackend(format!("Failed to parse response JSON: {}", e))
        })
    }
}

/// Moves a request to the backend and hands back the raw status and body.
///
/// Only failures that prevent getting any HTTP response are returned as
/// errors; status classification is left to the caller.
#[async_trait]
pub trait ChatTransport: Send + Sync + std::fmt::Debug {
    async fn post_json(&self, request: &TransportRequest) -> CoreResult<TransportResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> CoreResult<Self> {
        // Connect timeout 30s, whole request 120s; long completions can take a while.
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(120))
            .tcp_keepalive(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| CoreError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post_json(&self, request: &TransportRequest) -> CoreResult<TransportResponse> {
        let mut builder = self
            .http_client
            .post(&request.url)
            .header("Content-Type", "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .json(&request.body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&request.url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&request.url, e))?;

        log::debug!("POST {} -> {} ({} bytes)", request.url, status, body.len());
        Ok(TransportResponse { status, body })
    }
}

fn classify_reqwest_error(url: &str, e: reqwest::Error) -> CoreError {
    let message = format!("Request to {} failed: {}", url, e);
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        CoreError::TransientBackend(message)
    } else {
        CoreError::FatalBackend(message)
    }
}

/// Maps a non-success HTTP response to the retryable/fatal split.
///
/// Error payload codes take precedence over the status: OpenAI reports an
/// exhausted quota as 429, which no amount of waiting fixes.
pub fn classify_failure(status: u16, body: &str) -> CoreError {
    let payload: Option<Value> = serde_json::from_str(body).ok();
    let error_obj = payload.as_ref().and_then(|v| v.get("error"));

    let error_type = error_obj
        .and_then(|e| e.get("type"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let error_code = error_obj
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let detail = error_obj
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| preview(body));

    let message = format!("HTTP {}: {}", status, detail);

    let tags = [error_type, error_code];
    if tags
        .iter()
        .any(|t| matches!(*t, "insufficient_quota" | "billing_hard_limit_reached"))
    {
        return CoreError::FatalBackend(message);
    }
    if tags.iter().any(|t| {
        matches!(
            *t,
            "rate_limit_error" | "rate_limit_exceeded" | "overloaded_error"
        )
    }) {
        return CoreError::TransientBackend(message);
    }

    match status {
        408 | 425 | 429 | 500..=599 => CoreError::TransientBackend(message),
        _ => CoreError::FatalBackend(message),
    }
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_PREVIEW {
        return trimmed.to_string();
    }
    let mut end = ERROR_BODY_PREVIEW;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
