//! Outbound message delivery.
//!
//! The pipeline talks to [`OutboundMessenger`]; the production
//! implementation is [`whatsapp::WhatsAppClient`] against the WhatsApp
//! Cloud API. Delivery is at-most-once: a failed send is reported upward
//! and never retried here.

use async_trait::async_trait;

pub mod whatsapp;

/// Errors from outbound delivery.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// HTTP transport failure, including timeouts.
    #[error("delivery request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The messaging API responded with an error status.
    #[error("messaging API returned status {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
}

/// Outbound delivery interface.
#[async_trait]
pub trait OutboundMessenger: Send + Sync {
    /// Send a plain text message to the given contact handle.
    ///
    /// Invoked at most once per reply.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] on transport or API failure.
    async fn send_text(&self, to: &str, text: &str) -> Result<(), DeliveryError>;
}
