//! Gemini provider implementation using the `generateContent` API.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OracleConfig;

use super::{check_http_response, LlmProvider, ProviderError};

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Gemini `generateContent` request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct GeminiRequest {
    /// Conversation contents. Always a single user turn for this bot.
    pub contents: Vec<GeminiContent>,
}

/// A content block in Gemini wire format.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Text parts of the block.
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A single text part.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    /// The text content.
    pub text: String,
}

/// Gemini `generateContent` response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    /// Response candidates. Only the first is used.
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

/// A response candidate.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    /// Candidate content.
    pub content: Option<GeminiContent>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Google Gemini `generateContent` API provider.
///
/// The API key travels in the `x-goog-api-key` header rather than the URL
/// query string, so it cannot leak through request-URL error messages.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    /// Create a new provider from oracle configuration and a resolved key.
    pub fn new(config: &OracleConfig, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key,
        }
    }
}

/// Parse a Gemini API response body into the completion text.
///
/// Concatenates the text parts of the first candidate.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the body cannot be deserialized or
/// contains no candidate text.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<String, ProviderError> {
    let resp: GeminiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("missing candidates[0]".to_owned()))?;

    let text: String = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ProviderError::Parse(
            "candidate contained no text parts".to_owned(),
        ));
    }
    Ok(text)
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_owned(),
                }],
            }],
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "sending oracle request");
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        let text = parse_response(&payload)?;
        debug!(response_chars = text.len(), "oracle response received");
        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
