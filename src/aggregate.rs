//! Deterministic post-processing of report rows before narration.
//!
//! A language model cannot be trusted with exact decimal sums. When the
//! user asked for a total and the store returned raw per-entry rows, the
//! total is computed here in code and the rows are replaced with a single
//! pre-summed record; the narration prompt then only has to format it.

use rust_decimal::Decimal;
use tracing::debug;

use crate::types::ReportRow;

/// The per-entry amount column in raw rows.
const AMOUNT_FIELD: &str = "total_amount";

/// The synthetic field carrying a total computed here.
const CALCULATED_FIELD: &str = "total_calculated";

/// Reconcile query rows with the question's lexical intent.
///
/// If the question asks for a total and the rows are not already
/// aggregated, replaces the row set with a single
/// `{"total_calculated": "<sum>"}` record, summing the raw
/// `total_amount` column with decimal arithmetic and rounding to 2 places.
/// Rows that already carry an aggregate column, and questions that are not
/// totals requests, pass through unchanged.
pub fn reconcile(rows: Vec<ReportRow>, question: &str) -> Vec<ReportRow> {
    if !wants_total(question) || rows.is_empty() {
        return rows;
    }

    if rows.first().is_some_and(is_preaggregated) {
        debug!("rows already carry an aggregate column, passing through");
        return rows;
    }

    let mut total = rows
        .iter()
        .map(|row| row.get(AMOUNT_FIELD).map_or(Decimal::ZERO, parse_amount))
        .fold(Decimal::ZERO, |acc, amount| acc.saturating_add(amount))
        .round_dp(2);
    total.rescale(2);

    let formatted = total.to_string();
    debug!(total = %formatted, rows = rows.len(), "computed total in place of raw rows");

    let mut summary = ReportRow::new();
    summary.insert(
        CALCULATED_FIELD.to_owned(),
        serde_json::Value::String(formatted),
    );
    vec![summary]
}

/// Lexical signal that the user wants a sum rather than a listing.
fn wants_total(question: &str) -> bool {
    let lower = question.to_lowercase();
    lower.contains("total") || lower.contains("sum") || lower.contains("how much")
}

/// Whether a row already carries a database-computed aggregate.
///
/// Any column other than the raw per-entry `total_amount` whose name
/// mentions sum, total, or count counts as one: `total`, `total_sum`,
/// `count`, `total_spent` all qualify.
fn is_preaggregated(row: &ReportRow) -> bool {
    row.keys().any(|key| {
        let lower = key.to_lowercase();
        lower != AMOUNT_FIELD
            && (lower.contains("sum") || lower.contains("total") || lower.contains("count"))
    })
}

/// Parse a row amount, tolerating the string form Postgres uses for
/// decimals as well as plain JSON numbers. Unparseable values count as 0.
fn parse_amount(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::String(s) => s.trim().parse::<Decimal>().unwrap_or(Decimal::ZERO),
        serde_json::Value::Number(n) => n
            .as_f64()
            .and_then(Decimal::from_f64_retain)
            .unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}
