//! Core domain types shared across the pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A normalized inbound chat message handed to the pipeline by the transport.
///
/// The transport has already dealt with webhook framing; from here on the
/// message text is plain untrusted user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Opaque contact handle (the sender's phone number for WhatsApp).
    pub contact_handle: String,
    /// Raw message text.
    pub text: String,
}

/// Whether a ledger entry adds to or subtracts from the user's money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Money received.
    Income,
    /// Money spent.
    Expense,
}

impl EntryKind {
    /// Returns the string representation stored in Postgres.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

/// One line item of a proposed transaction, as extracted from a message.
///
/// Field names mirror the JSON shape the extraction prompt pins down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemDraft {
    /// What was bought or received.
    pub item_name: String,
    /// How many units. Must be positive; enforced at write time.
    pub quantity: Decimal,
    /// Price per unit.
    #[serde(rename = "price_per_item")]
    pub unit_price: Decimal,
}

/// A proposed transaction extracted from a message, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// The line items making up the transaction.
    pub items: Vec<LineItemDraft>,
}

/// Classified intent of one inbound message.
///
/// This is a closed set: the extractor maps any unrecognized tag from the
/// oracle to [`UserIntent::Other`] explicitly, with a warning log; an
/// unknown tag never falls through silently.
#[derive(Debug, Clone, PartialEq)]
pub enum UserIntent {
    /// Record a new transaction.
    Create(TransactionDraft),
    /// Answer a question about recorded data.
    Read,
    /// Record a transaction and answer a question, in one message.
    Both(TransactionDraft),
    /// Greeting or anything else; reply conversationally.
    Other,
}

/// A ledger entry as persisted, returned from the writer for acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedEntry {
    /// Database row id of the entry.
    pub id: i64,
    /// Income or expense.
    pub kind: EntryKind,
    /// Total amount computed from the line items, rounded to 2 places.
    pub total_amount: Decimal,
    /// Short description (the first item's name).
    pub description: Option<String>,
}

/// A parameterized read query synthesized by the oracle.
///
/// Untrusted until it passes [`crate::query::validate_report_query`]; the
/// executor only ever sees validated instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportQuery {
    /// SQL text with `$1`, `$2`, ... placeholders.
    pub query: String,
    /// Values for the placeholders, in order. `params[0]` must be the
    /// requesting user's id.
    pub params: Vec<serde_json::Value>,
}

/// An untyped result row from a report query.
///
/// Postgres surfaces decimals and timestamps as strings here; anything that
/// needs arithmetic re-parses the value first.
pub type ReportRow = serde_json::Map<String, serde_json::Value>;
