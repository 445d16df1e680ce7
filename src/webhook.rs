//! Inbound webhook endpoint for the WhatsApp Cloud API.
//!
//! Deliberately thin: verify the subscription handshake, pull
//! `(contact_handle, message_text)` pairs out of the envelope, hand each
//! one to the pipeline on its own task, and acknowledge with 200 no matter
//! what. Meta retries non-200 deliveries, and the pipeline already
//! guarantees its own error handling.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{debug, info};

use crate::pipeline::Pipeline;
use crate::types::InboundMessage;

/// Shared state for the webhook handlers.
pub struct WebhookState {
    /// The message pipeline.
    pub pipeline: Arc<Pipeline>,
    /// Expected `hub.verify_token` value for the handshake.
    pub verify_token: String,
}

/// Build the webhook router.
pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Verification handshake
// ---------------------------------------------------------------------------

/// Answer the subscription handshake: echo the challenge when the mode is
/// `subscribe` and the verify token matches, else refuse.
pub fn check_verification(
    params: &HashMap<String, String>,
    expected_token: &str,
) -> Option<String> {
    let mode = params.get("hub.mode")?;
    let token = params.get("hub.verify_token")?;
    let challenge = params.get("hub.challenge")?;
    if mode == "subscribe" && token == expected_token {
        Some(challenge.clone())
    } else {
        None
    }
}

async fn verify(
    State(state): State<Arc<WebhookState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    match check_verification(&params, &state.verify_token) {
        Some(challenge) => {
            info!("webhook verified");
            (StatusCode::OK, challenge)
        }
        None => (StatusCode::FORBIDDEN, String::new()),
    }
}

// ---------------------------------------------------------------------------
// Inbound envelope
// ---------------------------------------------------------------------------

/// Top-level webhook envelope. Every layer defaults to empty so that
/// status-update deliveries and unfamiliar payloads parse instead of 400ing.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookEnvelope {
    /// Object type; messages arrive as "whatsapp_business_account".
    #[serde(default)]
    pub object: Option<String>,
    /// Account-level entries.
    #[serde(default)]
    pub entry: Vec<EnvelopeEntry>,
}

/// One account entry in the envelope.
#[derive(Debug, Default, Deserialize)]
pub struct EnvelopeEntry {
    /// Field changes within the entry.
    #[serde(default)]
    pub changes: Vec<EnvelopeChange>,
}

/// One change notification.
#[derive(Debug, Default, Deserialize)]
pub struct EnvelopeChange {
    /// The changed value; carries messages when present.
    #[serde(default)]
    pub value: EnvelopeValue,
}

/// Value payload of a change.
#[derive(Debug, Default, Deserialize)]
pub struct EnvelopeValue {
    /// Inbound messages, if this change carries any.
    #[serde(default)]
    pub messages: Vec<EnvelopeMessage>,
}

/// One inbound message in wire format.
#[derive(Debug, Default, Deserialize)]
pub struct EnvelopeMessage {
    /// Sender phone number.
    #[serde(default)]
    pub from: Option<String>,
    /// Text content, absent for media and reactions.
    #[serde(default)]
    pub text: Option<EnvelopeText>,
}

/// Text body wrapper.
#[derive(Debug, Deserialize)]
pub struct EnvelopeText {
    /// The message text.
    pub body: String,
}

/// Flatten an envelope into the text messages it carries.
///
/// Non-text messages and entries without a sender are skipped.
pub fn extract_messages(envelope: &WebhookEnvelope) -> Vec<InboundMessage> {
    if envelope.object.as_deref() != Some("whatsapp_business_account") {
        return Vec::new();
    }
    envelope
        .entry
        .iter()
        .flat_map(|entry| &entry.changes)
        .flat_map(|change| &change.value.messages)
        .filter_map(|message| {
            let from = message.from.as_ref()?;
            let text = message.text.as_ref()?;
            Some(InboundMessage {
                contact_handle: from.clone(),
                text: text.body.clone(),
            })
        })
        .collect()
}

async fn receive(
    State(state): State<Arc<WebhookState>>,
    payload: Result<Json<WebhookEnvelope>, JsonRejection>,
) -> StatusCode {
    // Meta retries non-200 deliveries; an undecodable body gets the same
    // acknowledgement as an empty one.
    let Ok(Json(envelope)) = payload else {
        debug!("undecodable webhook body acknowledged and dropped");
        return StatusCode::OK;
    };

    let messages = extract_messages(&envelope);
    debug!(count = messages.len(), "inbound webhook delivery");

    for message in messages {
        // One task per message; messages are independent and unordered.
        let pipeline = Arc::clone(&state.pipeline);
        tokio::spawn(async move {
            pipeline.handle_message(message).await;
        });
    }

    StatusCode::OK
}
