//! WhatsApp Cloud API client for outbound text messages.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::WhatsAppConfig;
use crate::providers::sanitize_error_body;

use super::{DeliveryError, OutboundMessenger};

/// Outbound text message payload in Cloud API wire format.
#[derive(Debug, Serialize)]
struct TextMessagePayload<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextBody<'a>,
}

/// Text body of an outbound message.
#[derive(Debug, Serialize)]
struct TextBody<'a> {
    preview_url: bool,
    body: &'a str,
}

/// Client for the WhatsApp Cloud API (`graph.facebook.com`).
pub struct WhatsAppClient {
    client: reqwest::Client,
    api_base: String,
    phone_number_id: String,
    access_token: String,
}

impl std::fmt::Debug for WhatsAppClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppClient")
            .field("api_base", &self.api_base)
            .field("phone_number_id", &self.phone_number_id)
            .finish_non_exhaustive()
    }
}

impl WhatsAppClient {
    /// Create a new client from configuration and a resolved access token.
    pub fn new(config: &WhatsAppConfig, access_token: String) -> Self {
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
            phone_number_id: config.phone_number_id.clone(),
            access_token,
        }
    }
}

#[async_trait::async_trait]
impl OutboundMessenger for WhatsAppClient {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), DeliveryError> {
        let url = format!("{}/{}/messages", self.api_base, self.phone_number_id);
        let payload = TextMessagePayload {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: TextBody {
                preview_url: false,
                body: text,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                body: sanitize_error_body(&body),
            });
        }

        debug!(to, chars = text.len(), "message delivered");
        Ok(())
    }
}
