//! Recovery of structured data from oracle text output.
//!
//! The oracle is told to emit pure JSON, but in practice wraps it in code
//! fences or stray prose. Recovery is a two-stage parse: look for a fenced
//! block first, then fall back to the outermost brace pair. Only when both
//! stages fail is the output declared malformed.

use serde::Deserialize;
use tracing::warn;

use crate::types::{TransactionDraft, UserIntent};

/// Errors from structured-output recovery.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Neither a fenced block nor a brace pair was found.
    #[error("no JSON object found in oracle output")]
    NoJsonFound,

    /// A candidate block was found but did not parse as JSON.
    #[error("oracle output is not valid JSON: {0}")]
    InvalidJson(String),

    /// Valid JSON, but not the shape the prompt pinned down.
    #[error("oracle output has unexpected shape: {0}")]
    UnexpectedShape(String),

    /// A CREATE/BOTH intent arrived without a transaction payload.
    #[error("intent requires a transaction payload but none was given")]
    MissingTransaction,

    /// A transaction payload arrived with no line items.
    #[error("transaction payload has no line items")]
    EmptyTransaction,
}

/// Locate and parse a JSON object embedded in free-form oracle text.
///
/// Stage 1 looks for a code-fenced block (with or without a `json` tag).
/// Stage 2 falls back to the span between the first `{` and the last `}`.
///
/// # Errors
///
/// Returns [`ExtractError::NoJsonFound`] when neither stage locates a
/// candidate, or [`ExtractError::InvalidJson`] when the candidate does not
/// parse.
pub fn json_from_text(text: &str) -> Result<serde_json::Value, ExtractError> {
    let candidate = match fenced_block(text) {
        Some(block) => block,
        None => outer_brace_span(text).ok_or(ExtractError::NoJsonFound)?,
    };

    serde_json::from_str(candidate.trim()).map_err(|e| ExtractError::InvalidJson(e.to_string()))
}

/// Find the content of the first code-fenced block, if any.
fn fenced_block(text: &str) -> Option<&str> {
    let fence = regex::Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").ok()?;
    fence.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Find the span between the first `{` and the last `}`, if both exist.
fn outer_brace_span(text: &str) -> Option<&str> {
    let first = text.find('{')?;
    let last = text.rfind('}')?;
    if last < first {
        return None;
    }
    text.get(first..=last)
}

/// Wire shape of the intent-classification response.
#[derive(Debug, Deserialize)]
struct IntentEnvelope {
    intent: String,
    #[serde(default)]
    transaction: Option<TransactionDraft>,
}

/// Parse an oracle intent-classification response into a [`UserIntent`].
///
/// Unrecognized intent tags are logged and mapped to [`UserIntent::Other`]
/// rather than rejected: a misfiring classifier should get the friendly
/// fallback reply, not an apology.
///
/// # Errors
///
/// Returns [`ExtractError`] when no parseable JSON is found, the shape is
/// wrong, or a CREATE/BOTH intent is missing its transaction payload.
pub fn parse_intent(oracle_output: &str) -> Result<UserIntent, ExtractError> {
    let value = json_from_text(oracle_output)?;
    let envelope: IntentEnvelope = serde_json::from_value(value)
        .map_err(|e| ExtractError::UnexpectedShape(e.to_string()))?;

    match envelope.intent.to_uppercase().as_str() {
        "CREATE" => Ok(UserIntent::Create(require_transaction(
            envelope.transaction,
        )?)),
        "READ" => Ok(UserIntent::Read),
        "BOTH" => Ok(UserIntent::Both(require_transaction(envelope.transaction)?)),
        "OTHER" => Ok(UserIntent::Other),
        other => {
            warn!(intent = other, "unrecognized intent tag, treating as OTHER");
            Ok(UserIntent::Other)
        }
    }
}

fn require_transaction(
    transaction: Option<TransactionDraft>,
) -> Result<TransactionDraft, ExtractError> {
    let draft = transaction.ok_or(ExtractError::MissingTransaction)?;
    if draft.items.is_empty() {
        return Err(ExtractError::EmptyTransaction);
    }
    Ok(draft)
}
