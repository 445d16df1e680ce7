//! Parameterized execution of validated report queries.
//!
//! The query text is oracle-authored but has already passed
//! [`crate::query::validate_report_query`]; values still travel exclusively
//! as bound parameters; nothing is ever interpolated into the SQL text.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row, TypeInfo};
use tracing::debug;

use crate::types::{ReportQuery, ReportRow};

use super::{classify_read_error, StoreError};

/// Execute a validated report query and convert the rows to untyped maps.
///
/// The first placeholder is always bound to the validated `user_id` as an
/// integer, regardless of how the oracle spelled it; remaining parameters
/// are bound by their JSON type.
///
/// # Errors
///
/// Returns [`StoreError::Query`] if the store rejects the statement,
/// [`StoreError::Unavailable`] on connectivity failure.
pub async fn run_report(
    pool: &PgPool,
    report: &ReportQuery,
    user_id: i64,
) -> Result<Vec<ReportRow>, StoreError> {
    let mut query = sqlx::query(&report.query).bind(user_id);
    for param in report.params.iter().skip(1) {
        query = match param {
            serde_json::Value::Null => query.bind(None::<String>),
            serde_json::Value::Bool(b) => query.bind(*b),
            serde_json::Value::Number(n) if n.is_i64() => query.bind(n.as_i64()),
            serde_json::Value::Number(n) => query.bind(n.as_f64()),
            serde_json::Value::String(s) => query.bind(s.clone()),
            other => query.bind(other.to_string()),
        };
    }

    let rows = query
        .fetch_all(pool)
        .await
        .map_err(classify_read_error)?;

    debug!(rows = rows.len(), "report query executed");
    Ok(rows.iter().map(row_to_json).collect())
}

/// Convert one Postgres row into an untyped JSON map.
///
/// NUMERIC and date/time columns surface as strings, matching the
/// text-first row contract the aggregator parses against. Columns that fail
/// to decode become JSON null rather than sinking the whole report.
fn row_to_json(row: &PgRow) -> ReportRow {
    let mut map = ReportRow::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name());
        map.insert(column.name().to_owned(), value);
    }
    map
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> serde_json::Value {
    use serde_json::Value;

    match type_name {
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| Value::from(i64::from(v))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| Value::from(i64::from(v))),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| Value::from(f64::from(v))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, Value::from),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| Value::String(v.to_string())),
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, Value::from),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| Value::String(v.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| Value::String(v.to_string())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, |v| Value::String(v.to_string())),
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map_or(Value::Null, Value::String),
    }
}
