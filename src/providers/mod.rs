//! Language-model oracle abstraction.
//!
//! Defines the [`LlmProvider`] trait the pipeline calls for every
//! language-understanding step. One provider is implemented:
//! [`gemini::GeminiProvider`] — Google `generateContent` API.
//!
//! Callers treat the oracle as text in, text out, and nothing else: all
//! structure is extracted and validated on our side (see [`crate::extract`]
//! and [`crate::query`]), never assumed from the provider.

use async_trait::async_trait;
use regex::Regex;

pub mod gemini;

/// Errors returned by oracle providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure, including request timeouts.
    #[error("oracle request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match the expected schema.
    #[error("oracle response parse error: {0}")]
    Parse(String),
    /// Upstream responded with an error status.
    #[error("oracle returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
}

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure, `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_error_body(&body),
        });
    }
    Ok(body)
}

/// Collapse whitespace, redact credential-shaped substrings, and truncate.
///
/// Applied to every upstream error body before it reaches logs or error
/// chains. Patterns cover Google API keys and Meta access tokens, the two
/// credential families this process holds.
pub(crate) fn sanitize_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"AIza[A-Za-z0-9_\-]{30,}",
        r"EAA[A-Za-z0-9]{20,}",
        r"Bearer [A-Za-z0-9_\-\.]{16,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

/// Core oracle interface: one prompt in, one text completion out.
///
/// Implementations must be `Send + Sync` so the pipeline can share them
/// across per-message tasks. Each call is bounded by the provider's request
/// timeout; exceeding it surfaces as [`ProviderError::Request`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on API, network, timeout, or parse failure.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// The model identifier string this provider is instantiated for.
    fn model_id(&self) -> &str;
}
