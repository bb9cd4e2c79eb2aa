//! Chat-completions client.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use bookforge_shared::{BookForgeError, Result};

/// Default chat completions endpoint.
const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Client for the chat completions API.
///
/// One request per call, no streaming, no retries. Model and sampling
/// parameters are fixed at construction from the application config.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatClient {
    /// Build a chat client. No timeout is configured beyond the transport
    /// default.
    pub fn new(api_key: String, model: String, max_tokens: u32, temperature: f32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("BookForge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BookForgeError::Network(format!("client build: {e}")))?;

        Ok(Self {
            client,
            url: CHAT_COMPLETIONS_URL.to_string(),
            api_key,
            model,
            max_tokens,
            temperature,
        })
    }

    /// Point the client at a different completions endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// The model this client sends requests to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Issue one chat completion with a system and a user message, returning
    /// the trimmed response text.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&self.url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| BookForgeError::Network(format!("chat completions: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(BookForgeError::Network(format!(
                "chat completions returned HTTP {status}: {text}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BookForgeError::TextGeneration(format!("parse response: {e}")))?;

        let content = extract_content(parsed)?;
        debug!(chars = content.len(), "chat completion received");
        Ok(content)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| BookForgeError::config("OpenAI API key contains invalid bytes"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Pull the first choice's message content out of a parsed response.
fn extract_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .ok_or_else(|| BookForgeError::TextGeneration("response contained no choices".into()))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_expected_shape() {
        let body = ChatRequest {
            model: "gpt-4o",
            max_tokens: 1500,
            temperature: 0.7,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are an assistant that writes content for e-books.",
                },
                ChatMessage {
                    role: "user",
                    content: "Write a chapter.",
                },
            ],
        };

        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 1500);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Write a chapter.");
    }

    #[test]
    fn response_content_is_trimmed() {
        let raw = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "  CHAPTER 01 - Bees\n"}}
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).expect("parse");
        let content = extract_content(parsed).expect("content");
        assert_eq!(content, "CHAPTER 01 - Bees");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).expect("parse");
        let err = extract_content(parsed).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    fn test_client(server: &wiremock::MockServer) -> ChatClient {
        ChatClient::new("test-key".into(), "gpt-4o".into(), 1500, 0.7)
            .expect("client")
            .with_url(format!("{}/v1/chat/completions", server.uri()))
    }

    #[tokio::test]
    async fn complete_returns_first_choice_content() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/chat/completions"))
            .and(wiremock::matchers::header("authorization", "Bearer test-key"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "  CHAPTER 01 - Bees\n"}}
                ]
            })))
            .mount(&server)
            .await;

        let content = test_client(&server)
            .complete("system role", "user prompt")
            .await
            .expect("completion");
        assert_eq!(content, "CHAPTER 01 - Bees");
    }

    #[tokio::test]
    async fn non_success_status_maps_to_network_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/chat/completions"))
            .respond_with(
                wiremock::ResponseTemplate::new(429).set_body_string("rate limit exceeded"),
            )
            .mount(&server)
            .await;

        let err = test_client(&server)
            .complete("system role", "user prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, BookForgeError::Network(_)), "{err}");
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("rate limit exceeded"));
    }

    #[tokio::test]
    async fn malformed_body_maps_to_text_generation_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/chat/completions"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .complete("system role", "user prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, BookForgeError::TextGeneration(_)), "{err}");
    }
}
