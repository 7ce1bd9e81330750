use serde_json::json;
use std::sync::Arc;

use super::support::{chat_completion, header, provider_config, StubTransport};
use crate::cons::provider_cons::LLMProvider;
use crate::error::CoreError;
use crate::llm::models::openai::{
    build_chat_completions_request_body, chat_completions_url_candidates, OpenAiClient,
};
use crate::llm::models::provider_base::{Message, ProviderClient, Role};

#[cfg(test)]
mod tests {
    use super::*;

    fn client(stub: &Arc<StubTransport>) -> OpenAiClient {
        OpenAiClient::configure(LLMProvider::OpenAI, &provider_config("sk-test"), stub.clone())
            .expect("configure")
    }

    #[test]
    fn url_candidates_add_v1_fallback_only_when_missing() {
        assert_eq!(
            chat_completions_url_candidates("https://api.openai.com/v1/"),
            vec!["https://api.openai.com/v1/chat/completions".to_string()]
        );
        assert_eq!(
            chat_completions_url_candidates("http://localhost:1234"),
            vec![
                "http://localhost:1234/chat/completions".to_string(),
                "http://localhost:1234/v1/chat/completions".to_string(),
            ]
        );
    }

    #[test]
    fn request_body_carries_model_temperature_and_roles() {
        let stub = StubTransport::new();
        let c = client(&stub);
        let body = build_chat_completions_request_body(
            c.settings(),
            vec![Message::system("be brief"), Message::user("hi")],
        );
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert!(body.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn send_records_exchange_and_sends_bearer_token() {
        let stub = StubTransport::new();
        stub.push_response(200, chat_completion("Hi there"));
        let mut c = client(&stub);

        let reply = c.send("Hello", &[]).await.expect("reply");
        assert_eq!(reply, "Hi there");

        let history = c.history().messages();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], Message::user("Hello"));
        assert_eq!(history[1], Message::assistant("Hi there"));

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(header(&requests[0], "authorization"), Some("Bearer sk-test"));
    }

    #[tokio::test]
    async fn repeated_sends_alternate_user_and_assistant() {
        let stub = StubTransport::new();
        let mut c = client(&stub);
        for i in 0..3 {
            stub.push_response(200, chat_completion(&format!("reply {}", i)));
            c.send(&format!("question {}", i), &[]).await.expect("reply");
        }

        let history = c.history().messages();
        assert_eq!(history.len(), 6);
        for (i, msg) in history.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(msg.role, expected);
        }
        assert_eq!(history[4].content, "question 2");
    }

    #[tokio::test]
    async fn context_is_sent_between_system_prompt_and_message() {
        let stub = StubTransport::new();
        stub.push_response(200, chat_completion("ok"));
        let mut config = provider_config("k");
        config
            .extra
            .insert("system_prompt".to_string(), json!("You are terse."));
        let mut c = OpenAiClient::configure(LLMProvider::OpenAI, &config, stub.clone())
            .expect("configure");

        c.send("What now?", &[Message::system("Project: 3 files")])
            .await
            .expect("reply");

        let body = &stub.requests()[0].body;
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "system", "user"]);
        assert_eq!(body["messages"][0]["content"], "You are terse.");
        assert_eq!(body["messages"][1]["content"], "Project: 3 files");
        assert_eq!(body["messages"][2]["content"], "What now?");
        // History holds only the exchange, not the context.
        assert_eq!(c.history().len(), 2);
    }

    #[tokio::test]
    async fn not_found_falls_back_to_v1_path() {
        let stub = StubTransport::new();
        stub.push_raw(404, "not found");
        stub.push_response(200, chat_completion("from v1"));
        let mut config = provider_config("k");
        config.endpoint = Some("http://localhost:8080".to_string());
        let mut c = OpenAiClient::configure(LLMProvider::DeepSeek, &config, stub.clone())
            .expect("configure");

        assert_eq!(c.send("hi", &[]).await.unwrap(), "from v1");
        let urls: Vec<String> = stub.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:8080/chat/completions".to_string(),
                "http://localhost:8080/v1/chat/completions".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn rate_limit_is_transient_and_leaves_history_untouched() {
        let stub = StubTransport::new();
        stub.push_response(200, chat_completion("first"));
        stub.push_response(
            429,
            json!({"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}}),
        );
        let mut c = client(&stub);
        c.send("one", &[]).await.expect("first reply");

        let err = c.send("two", &[]).await.expect_err("should fail");
        assert!(err.is_retryable(), "got {:?}", err);
        assert_eq!(c.history().len(), 2);
        assert_eq!(c.history().last().unwrap().content, "first");
    }

    #[tokio::test]
    async fn bad_credentials_are_fatal() {
        let stub = StubTransport::new();
        stub.push_response(
            401,
            json!({"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}),
        );
        let mut c = client(&stub);
        let err = c.send("hi", &[]).await.expect_err("should fail");
        assert!(matches!(err, CoreError::FatalBackend(ref m) if m.contains("Incorrect API key")));
        assert!(c.history().is_empty());
    }

    #[tokio::test]
    async fn exhausted_quota_is_fatal_even_on_429() {
        let stub = StubTransport::new();
        stub.push_response(
            429,
            json!({"error": {"message": "You exceeded your current quota", "type": "insufficient_quota", "code": "insufficient_quota"}}),
        );
        let mut c = client(&stub);
        let err = c.send("hi", &[]).await.expect_err("should fail");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn transport_timeout_is_transient() {
        let stub = StubTransport::new();
        stub.push_error(CoreError::TransientBackend("timed out".to_string()));
        let mut c = client(&stub);
        let err = c.send("hi", &[]).await.expect_err("should fail");
        assert!(err.is_retryable());
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn reply_without_content_is_fatal() {
        let stub = StubTransport::new();
        stub.push_response(200, json!({"choices": []}));
        let mut c = client(&stub);
        let err = c.send("hi", &[]).await.expect_err("should fail");
        assert!(matches!(err, CoreError::FatalBackend(_)));
        assert!(c.history().is_empty());
    }

    #[tokio::test]
    async fn reset_history_clears_previous_exchanges() {
        let stub = StubTransport::new();
        stub.push_response(200, chat_completion("a"));
        let mut c = client(&stub);
        c.send("q", &[]).await.unwrap();
        c.reset_history();
        assert!(c.history().is_empty());
    }

    #[tokio::test]
    async fn generate_code_returns_fenced_body() {
        let stub = StubTransport::new();
        stub.push_response(
            200,
            chat_completion("Here you go:\n```python\nprint('hi')\n```\nEnjoy."),
        );
        let mut c = client(&stub);
        let code = c.generate_code("say hi", Some("python")).await.unwrap();
        assert_eq!(code, "print('hi')");

        let sent = stub.requests()[0].body["messages"][0]["content"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(sent.contains("python"));
        assert!(sent.contains("say hi"));
    }

    #[tokio::test]
    async fn analyze_code_splits_sections() {
        let stub = StubTransport::new();
        stub.push_response(
            200,
            chat_completion("Looks fine.\nSuggestions:\n- Add docs\nIssues:\nNone"),
        );
        let mut c = client(&stub);
        let analysis = c.analyze_code("fn main() {}", Some("rust")).await.unwrap();
        assert_eq!(analysis.suggestions, vec!["Add docs".to_string()]);
        assert!(analysis.issues.is_empty());
        assert!(analysis.analysis.starts_with("Looks fine."));
        assert_eq!(c.history().len(), 2);
    }
}
