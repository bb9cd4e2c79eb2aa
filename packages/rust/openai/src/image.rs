//! Image-generations client.
//!
//! Two HTTP round-trips per image: one POST to generate, one GET to fetch
//! the bytes from the returned URL. Either can fail independently and maps
//! to a distinct error variant so the pipeline can log and skip the asset.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use bookforge_shared::{BookForgeError, Result};

/// Default image generations endpoint.
const IMAGE_GENERATIONS_URL: &str = "https://api.openai.com/v1/images/generations";

/// Fixed square output resolution.
const IMAGE_SIZE: &str = "1024x1024";

/// Client for the image generations API.
#[derive(Debug, Clone)]
pub struct ImageClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl ImageClient {
    /// Build an image client.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("BookForge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BookForgeError::Network(format!("client build: {e}")))?;

        Ok(Self {
            client,
            url: IMAGE_GENERATIONS_URL.to_string(),
            api_key,
            model,
        })
    }

    /// Point the client at a different generations endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// The model this client sends requests to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate one image for `prompt` and return its bytes.
    #[instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.len()))]
    pub async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        let body = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: IMAGE_SIZE,
            quality: "hd",
            style: "vivid",
        };

        let response = self
            .client
            .post(&self.url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| BookForgeError::ImageGeneration(format!("request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(BookForgeError::ImageGeneration(format!(
                "HTTP {status}: {text}"
            )));
        }

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| BookForgeError::ImageGeneration(format!("parse response: {e}")))?;

        let url = extract_url(parsed)?;
        debug!(%url, "image generated, downloading");

        self.download(&url).await
    }

    /// Fetch the generated image bytes from the result URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BookForgeError::Download(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BookForgeError::Download(format!("{url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BookForgeError::Download(format!("{url}: {e}")))?;

        Ok(bytes.to_vec())
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

/// Pull the first result URL out of a parsed response.
fn extract_url(response: ImageResponse) -> Result<String> {
    response
        .data
        .into_iter()
        .next()
        .map(|item| item.url)
        .ok_or_else(|| BookForgeError::ImageGeneration("response contained no images".into()))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    quality: &'a str,
    style: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_expected_shape() {
        let body = ImageRequest {
            model: "dall-e-3",
            prompt: "Minimal artwork about beekeeping",
            n: 1,
            size: IMAGE_SIZE,
            quality: "hd",
            style: "vivid",
        };

        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["model"], "dall-e-3");
        assert_eq!(json["n"], 1);
        assert_eq!(json["size"], "1024x1024");
        assert_eq!(json["quality"], "hd");
        assert_eq!(json["style"], "vivid");
    }

    #[test]
    fn response_url_is_extracted() {
        let raw = r#"{"data": [{"url": "https://images.example.com/abc.png"}]}"#;
        let parsed: ImageResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(
            extract_url(parsed).expect("url"),
            "https://images.example.com/abc.png"
        );
    }

    #[test]
    fn empty_data_is_an_error() {
        let parsed: ImageResponse = serde_json::from_str(r#"{"data": []}"#).expect("parse");
        let err = extract_url(parsed).unwrap_err();
        assert!(err.to_string().contains("no images"));
    }

    fn test_client(server: &wiremock::MockServer) -> ImageClient {
        ImageClient::new("test-key".into(), "dall-e-3".into())
            .expect("client")
            .with_url(format!("{}/v1/images/generations", server.uri()))
    }

    #[tokio::test]
    async fn generate_downloads_the_result_bytes() {
        let server = wiremock::MockServer::start().await;
        let asset_url = format!("{}/assets/cover.png", server.uri());

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/images/generations"))
            .and(wiremock::matchers::header("authorization", "Bearer test-key"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"url": asset_url}]
            })))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/assets/cover.png"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_bytes(b"\x89PNG-bytes".to_vec()),
            )
            .mount(&server)
            .await;

        let bytes = test_client(&server)
            .generate("Minimal artwork about beekeeping")
            .await
            .expect("image bytes");
        assert_eq!(bytes, b"\x89PNG-bytes");
    }

    #[tokio::test]
    async fn failed_generation_maps_to_image_generation_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/images/generations"))
            .respond_with(
                wiremock::ResponseTemplate::new(400).set_body_string("prompt rejected"),
            )
            .mount(&server)
            .await;

        let err = test_client(&server)
            .generate("Minimal artwork about beekeeping")
            .await
            .unwrap_err();
        assert!(matches!(err, BookForgeError::ImageGeneration(_)), "{err}");
        assert!(err.to_string().contains("prompt rejected"));
    }

    #[tokio::test]
    async fn failed_download_maps_to_download_error() {
        let server = wiremock::MockServer::start().await;
        let asset_url = format!("{}/assets/gone.png", server.uri());

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/v1/images/generations"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"url": asset_url}]
            })))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/assets/gone.png"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .generate("Minimal artwork about beekeeping")
            .await
            .unwrap_err();
        assert!(matches!(err, BookForgeError::Download(_)), "{err}");
        assert!(err.to_string().contains("404"));
    }
}
