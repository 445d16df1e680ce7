//! Parsing and safety validation of oracle-synthesized report queries.
//!
//! The oracle writes executable SQL, which makes it a hostile input
//! generator, not a trusted component. The prompt asks for a scoped,
//! read-only, parameterized SELECT; this module is the part that checks,
//! in code, that it actually got one. A query that fails any check never
//! reaches the executor.

use crate::extract::{json_from_text, ExtractError};
use crate::types::ReportQuery;

/// A synthesized query failed safety validation.
#[derive(Debug, thiserror::Error)]
pub enum QueryRejected {
    /// Statement does not start with SELECT.
    #[error("statement is not a SELECT")]
    NotReadOnly,

    /// More than one statement was supplied.
    #[error("statement contains multiple statements")]
    MultipleStatements,

    /// No `user_id = $1` ownership filter found.
    #[error("statement does not filter by user_id = $1")]
    MissingOwnerFilter,

    /// The first bound parameter is not the requesting user's id.
    #[error("first parameter does not equal the requesting user id {expected}")]
    OwnerParamMismatch {
        /// The id the first parameter was required to equal.
        expected: i64,
    },
}

/// Parse an oracle report-query response into a [`ReportQuery`].
///
/// Shares the two-stage JSON recovery with intent extraction.
///
/// # Errors
///
/// Returns [`ExtractError`] when no parseable `{query, params}` object is
/// found.
pub fn parse_report_query(oracle_output: &str) -> Result<ReportQuery, ExtractError> {
    let value = json_from_text(oracle_output)?;
    serde_json::from_value(value).map_err(|e| ExtractError::UnexpectedShape(e.to_string()))
}

/// Validate a synthesized query before execution.
///
/// Three independent checks, none of which trust the prompt:
/// 1. the statement starts with `SELECT` and is a single statement,
/// 2. the statement filters on `user_id = $1`,
/// 3. `params[0]` literally equals `user_id` (number or numeric string).
///
/// # Errors
///
/// Returns the first failed check as a [`QueryRejected`].
pub fn validate_report_query(report: &ReportQuery, user_id: i64) -> Result<(), QueryRejected> {
    let sql = report.query.trim();

    if !sql.to_lowercase().starts_with("select") {
        return Err(QueryRejected::NotReadOnly);
    }

    // One trailing semicolon is tolerated; any interior one means a second
    // statement is riding along.
    let body = sql.trim_end().trim_end_matches(';');
    if body.contains(';') {
        return Err(QueryRejected::MultipleStatements);
    }

    let normalized: String = sql
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !normalized.contains("user_id=$1") {
        return Err(QueryRejected::MissingOwnerFilter);
    }

    if !first_param_matches(report.params.first(), user_id) {
        return Err(QueryRejected::OwnerParamMismatch { expected: user_id });
    }

    Ok(())
}

/// The oracle sometimes emits the id as a JSON number and sometimes as a
/// numeric string; both count, anything else does not.
fn first_param_matches(param: Option<&serde_json::Value>, user_id: i64) -> bool {
    match param {
        Some(serde_json::Value::Number(n)) => n.as_i64() == Some(user_id),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>() == Ok(user_id),
        _ => false,
    }
}
