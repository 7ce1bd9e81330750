use serde_json::json;

use super::support::{header, messages_response, provider_config, StubTransport};
use crate::config::ProviderConfig;
use crate::llm::models::claude::{
    build_messages_request_body, messages_url, reply_text_from_messages_response, ClaudeClient,
};
use crate::llm::models::provider_base::{Message, ProviderClient};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_url_does_not_duplicate_v1() {
        assert_eq!(
            messages_url("https://api.anthropic.com"),
            "https://api.anthropic.com/v1/messages"
        );
        assert_eq!(
            messages_url("https://proxy.local/v1/"),
            "https://proxy.local/v1/messages"
        );
    }

    #[test]
    fn system_messages_are_hoisted_and_same_role_turns_merged() {
        let stub = StubTransport::new();
        let c = ClaudeClient::configure(&provider_config("k"), stub).unwrap();
        let body = build_messages_request_body(
            c.settings(),
            vec![
                Message::system("rules"),
                Message::user("ctx"),
                Message::user("question"),
                Message::system("more rules"),
            ],
        );

        assert_eq!(body["system"], "rules\nmore rules");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"][0]["text"], "ctx");
        assert_eq!(messages[0]["content"][1]["text"], "question");
        assert_eq!(body["max_tokens"], 4096);
    }

    #[test]
    fn temperature_is_clamped_to_messages_api_range() {
        let stub = StubTransport::new();
        let mut config = provider_config("k");
        config.temperature = Some(1.5);
        config.extra.insert("max_tokens".to_string(), json!(1024));
        let c = ClaudeClient::configure(&config, stub).unwrap();
        let body = build_messages_request_body(c.settings(), vec![Message::user("hi")]);
        assert_eq!(body["temperature"], 1.0);
        assert_eq!(body["max_tokens"], 1024);
        assert!(body.get("system").is_none());
    }

    #[test]
    fn reply_text_concatenates_text_blocks_only() {
        let v = json!({
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "tool_use", "id": "x", "name": "n", "input": {}},
                {"type": "text", "text": "world"}
            ]
        });
        assert_eq!(reply_text_from_messages_response(&v).unwrap(), "Hello, world");
        assert!(reply_text_from_messages_response(&json!({"content": []})).is_err());
    }

    #[tokio::test]
    async fn send_uses_api_key_and_version_headers() {
        let stub = StubTransport::new();
        stub.push_response(200, messages_response("Bonjour"));
        let mut c = ClaudeClient::configure(&provider_config("sk-ant"), stub.clone()).unwrap();

        let reply = c.send("Hello", &[]).await.unwrap();
        assert_eq!(reply, "Bonjour");
        assert_eq!(c.history().len(), 2);

        let request = &stub.requests()[0];
        assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(header(request, "x-api-key"), Some("sk-ant"));
        assert_eq!(header(request, "anthropic-version"), Some("2023-06-01"));
        assert_eq!(request.body["model"], "claude-3-5-sonnet-latest");
    }

    #[tokio::test]
    async fn custom_anthropic_version_is_used() {
        let stub = StubTransport::new();
        stub.push_response(200, messages_response("ok"));
        let config = ProviderConfig {
            api_key: Some("k".to_string()),
            extra: [("anthropic_version".to_string(), json!("2024-01-01"))]
                .into_iter()
                .collect(),
            ..ProviderConfig::default()
        };
        let mut c = ClaudeClient::configure(&config, stub.clone()).unwrap();
        c.send("hi", &[]).await.unwrap();
        assert_eq!(header(&stub.requests()[0], "anthropic-version"), Some("2024-01-01"));
    }

    #[tokio::test]
    async fn overloaded_is_transient() {
        let stub = StubTransport::new();
        stub.push_response(
            529,
            json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
        );
        let mut c = ClaudeClient::configure(&provider_config("k"), stub).unwrap();
        let err = c.send("hi", &[]).await.expect_err("should fail");
        assert!(err.is_retryable());
        assert!(c.history().is_empty());
    }

    #[tokio::test]
    async fn invalid_request_is_fatal() {
        let stub = StubTransport::new();
        stub.push_response(
            400,
            json!({"type": "error", "error": {"type": "invalid_request_error", "message": "messages: field required"}}),
        );
        let mut c = ClaudeClient::configure(&provider_config("k"), stub).unwrap();
        let err = c.send("hi", &[]).await.expect_err("should fail");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("HTTP 400"));
    }
}
