//! Researcher: web-search retrieval for BookForge.
//!
//! Sends the book topic to the Tavily search API and normalizes the response
//! into a [`ResearchRecord`]. When the API returns no synthesized answer but
//! does return result snippets, a fallback chat-completions call summarizes
//! the snippets into one. The fallback can itself fail; in that case the
//! answer stays empty and downstream TOC generation treats the record as
//! degraded input.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;

use bookforge_openai::ChatClient;
use bookforge_shared::{BookForgeError, ResearchRecord, Result, SearchResult};

/// System role for the snippet-summarization fallback.
const SUMMARIZER_ROLE: &str =
    "You are an assistant that summarizes search results into a coherent answer.";

/// Search API client.
#[derive(Debug, Clone)]
pub struct Researcher {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl Researcher {
    /// Build a researcher for the given search endpoint.
    pub fn new(endpoint: &str, api_key: String) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| BookForgeError::config(format!("invalid search endpoint: {e}")))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("BookForge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BookForgeError::Network(format!("client build: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// Search for `topic` and return a normalized research record.
    ///
    /// No retry on failure; a non-success status or transport error aborts
    /// with [`BookForgeError::Network`].
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn research(&self, topic: &str, chat: &ChatClient) -> Result<ResearchRecord> {
        let body = SearchRequest {
            query: topic,
            api_key: &self.api_key,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| BookForgeError::Network(format!("search request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(BookForgeError::Network(format!(
                "search API returned HTTP {status}: {text}"
            )));
        }

        let wire: SearchResponse = response
            .json()
            .await
            .map_err(|e| BookForgeError::Network(format!("parse search response: {e}")))?;

        let mut record = normalize(wire, topic);

        info!(
            results = record.results.len(),
            has_answer = !record.answer.is_empty(),
            "search complete"
        );

        if record.answer.is_empty() && !record.results.is_empty() {
            match synthesize_answer(chat, topic, &record).await {
                Ok(answer) => record.answer = answer,
                Err(e) => {
                    // Degraded input: the organizer detects the empty record.
                    warn!(error = %e, "answer fallback failed, continuing without answer");
                }
            }
        }

        Ok(record)
    }
}

/// Summarize result snippets into an answer via the chat API.
async fn synthesize_answer(
    chat: &ChatClient,
    query: &str,
    record: &ResearchRecord,
) -> Result<String> {
    let snippets = record.joined_snippets();
    let prompt = format!(
        "Based on the following search results, provide a comprehensive answer \
         to the query '{query}':\n\n{snippets}"
    );
    chat.complete(SUMMARIZER_ROLE, &prompt).await
}

/// Map the wire response onto the domain record, filling defaults for any
/// missing fields.
fn normalize(wire: SearchResponse, topic: &str) -> ResearchRecord {
    ResearchRecord {
        answer: wire.answer.unwrap_or_default(),
        query: wire.query.unwrap_or_else(|| topic.to_string()),
        images: wire.images.unwrap_or_default(),
        results: wire
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|r| SearchResult {
                title: r.title,
                url: r.url,
                snippet: r.snippet.or(r.content).unwrap_or_default(),
            })
            .collect(),
        response_time: wire.response_time,
        follow_up_questions: wire.follow_up_questions.unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    api_key: &'a str,
}

/// Raw search API response. Every field is optional; normalization fills
/// the gaps.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    answer: Option<String>,
    query: Option<String>,
    images: Option<Vec<String>>,
    results: Option<Vec<WireResult>>,
    response_time: Option<f64>,
    follow_up_questions: Option<Vec<String>>,
}

/// The API has shipped both `snippet` and `content` as the text field.
#[derive(Debug, Deserialize)]
struct WireResult {
    title: Option<String>,
    url: Option<String>,
    snippet: Option<String>,
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_fills_missing_fields() {
        let wire: SearchResponse = serde_json::from_str(r#"{"results": null}"#).expect("parse");
        let record = normalize(wire, "Modern Beekeeping");

        assert!(record.answer.is_empty());
        assert_eq!(record.query, "Modern Beekeeping");
        assert!(record.results.is_empty());
        assert!(record.is_empty());
    }

    #[test]
    fn normalize_full_response() {
        let raw = r#"{
            "answer": "Beekeeping is the maintenance of bee colonies.",
            "query": "Modern Beekeeping",
            "images": ["https://example.com/bee.jpg"],
            "results": [
                {"title": "Apiary basics", "url": "https://example.com/a", "content": "Hives need ventilation."},
                {"snippet": "Queens live for years."}
            ],
            "response_time": 1.42,
            "follow_up_questions": ["What is a Langstroth hive?"]
        }"#;
        let wire: SearchResponse = serde_json::from_str(raw).expect("parse");
        let record = normalize(wire, "Modern Beekeeping");

        assert!(!record.is_empty());
        assert_eq!(record.results.len(), 2);
        assert_eq!(record.results[0].snippet, "Hives need ventilation.");
        assert_eq!(record.results[1].snippet, "Queens live for years.");
        assert_eq!(record.response_time, Some(1.42));
        assert_eq!(
            record.joined_snippets(),
            "Hives need ventilation.\nQueens live for years."
        );
    }

    #[test]
    fn request_serializes_query_and_key() {
        let body = SearchRequest {
            query: "Modern Beekeeping",
            api_key: "tvly-test",
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["query"], "Modern Beekeeping");
        assert_eq!(json["api_key"], "tvly-test");
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let err = Researcher::new("not a url", "key".into()).unwrap_err();
        assert!(err.to_string().contains("invalid search endpoint"));
    }

    fn test_researcher(server: &wiremock::MockServer) -> Researcher {
        Researcher::new(&format!("{}/search", server.uri()), "tvly-test".into())
            .expect("researcher")
    }

    fn test_chat(server: &wiremock::MockServer) -> ChatClient {
        ChatClient::new("test-key".into(), "gpt-4o".into(), 1500, 0.7)
            .expect("client")
            .with_url(format!("{}/v1/chat/completions", server.uri()))
    }

    #[tokio::test]
    async fn non_success_search_status_maps_to_network_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/search"))
            .respond_with(wiremock::ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = test_researcher(&server)
            .research("Modern Beekeeping", &test_chat(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, BookForgeError::Network(_)), "{err}");
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn answer_present_skips_the_fallback() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/search"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "answer": "Beekeeping is the maintenance of bee colonies.",
                "results": [{"content": "Hives need ventilation."}]
            })))
            .mount(&server)
            .await;

        // Verified on server drop: no chat request may be issued.
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/chat/completions"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let record = test_researcher(&server)
            .research("Modern Beekeeping", &test_chat(&server))
            .await
            .expect("record");
        assert_eq!(record.answer, "Beekeeping is the maintenance of bee colonies.");
        assert_eq!(record.results.len(), 1);
    }

    #[tokio::test]
    async fn missing_answer_is_synthesized_from_snippets() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/search"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"content": "Hives need ventilation."},
                    {"snippet": "Queens live for years."}
                ]
            })))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/chat/completions"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "Bees live in ventilated hives."}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = test_researcher(&server)
            .research("Modern Beekeeping", &test_chat(&server))
            .await
            .expect("record");
        assert_eq!(record.answer, "Bees live in ventilated hives.");
        assert!(!record.is_empty());
    }

    #[tokio::test]
    async fn failed_fallback_leaves_answer_empty_and_continues() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/search"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"content": "Hives need ventilation."}]
            })))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/chat/completions"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let record = test_researcher(&server)
            .research("Modern Beekeeping", &test_chat(&server))
            .await
            .expect("degraded record");
        assert!(record.answer.is_empty());
        assert_eq!(record.results.len(), 1);
        // Snippets survive, so downstream TOC generation still has input.
        assert!(!record.is_empty());
    }
}
