//! Tests for `src/query.rs` — the safety boundary for oracle-authored SQL.

use khata::query::{parse_report_query, validate_report_query, QueryRejected};
use khata::types::ReportQuery;

fn report(query: &str, params: serde_json::Value) -> ReportQuery {
    ReportQuery {
        query: query.to_owned(),
        params: params.as_array().cloned().expect("params must be an array"),
    }
}

#[test]
fn scoped_select_with_string_id_passes() {
    let r = report(
        "SELECT SUM(total_amount) AS total FROM transactions WHERE user_id = $1 AND kind = $2;",
        serde_json::json!(["42", "expense"]),
    );
    validate_report_query(&r, 42).expect("should pass");
}

#[test]
fn scoped_select_with_numeric_id_passes() {
    let r = report(
        "SELECT total_amount FROM transactions WHERE user_id = $1",
        serde_json::json!([42]),
    );
    validate_report_query(&r, 42).expect("should pass");
}

#[test]
fn lowercase_select_with_leading_whitespace_passes() {
    let r = report(
        "  select id from transactions where user_id = $1",
        serde_json::json!(["7"]),
    );
    validate_report_query(&r, 7).expect("should pass");
}

#[test]
fn tight_spacing_on_owner_filter_passes() {
    let r = report(
        "SELECT id FROM transactions WHERE user_id=$1",
        serde_json::json!([7]),
    );
    validate_report_query(&r, 7).expect("should pass");
}

#[test]
fn delete_statement_is_rejected() {
    let r = report(
        "DELETE FROM transactions WHERE user_id = $1",
        serde_json::json!(["42"]),
    );
    let err = validate_report_query(&r, 42).expect_err("should fail");
    assert!(matches!(err, QueryRejected::NotReadOnly));
}

#[test]
fn update_statement_is_rejected() {
    let r = report(
        "UPDATE transactions SET total_amount = 0 WHERE user_id = $1",
        serde_json::json!(["42"]),
    );
    assert!(matches!(
        validate_report_query(&r, 42),
        Err(QueryRejected::NotReadOnly)
    ));
}

#[test]
fn cte_is_rejected_as_not_read_only() {
    // Postgres allows data-modifying CTEs, so WITH is rejected wholesale;
    // the synthesis prompt mandates subqueries instead.
    let r = report(
        "WITH t AS (SELECT * FROM transactions WHERE user_id = $1) SELECT * FROM t",
        serde_json::json!(["42"]),
    );
    assert!(matches!(
        validate_report_query(&r, 42),
        Err(QueryRejected::NotReadOnly)
    ));
}

#[test]
fn piggybacked_second_statement_is_rejected() {
    let r = report(
        "SELECT id FROM transactions WHERE user_id = $1; DROP TABLE users",
        serde_json::json!(["42"]),
    );
    assert!(matches!(
        validate_report_query(&r, 42),
        Err(QueryRejected::MultipleStatements)
    ));
}

#[test]
fn trailing_semicolon_is_tolerated() {
    let r = report(
        "SELECT id FROM transactions WHERE user_id = $1;",
        serde_json::json!([42]),
    );
    validate_report_query(&r, 42).expect("should pass");
}

#[test]
fn missing_owner_filter_is_rejected() {
    let r = report(
        "SELECT SUM(total_amount) FROM transactions WHERE kind = $1",
        serde_json::json!(["expense"]),
    );
    assert!(matches!(
        validate_report_query(&r, 42),
        Err(QueryRejected::MissingOwnerFilter)
    ));
}

#[test]
fn wrong_first_param_is_rejected() {
    let r = report(
        "SELECT id FROM transactions WHERE user_id = $1",
        serde_json::json!(["99"]),
    );
    let err = validate_report_query(&r, 42).expect_err("should fail");
    assert!(matches!(
        err,
        QueryRejected::OwnerParamMismatch { expected: 42 }
    ));
}

#[test]
fn empty_params_are_rejected() {
    let r = report(
        "SELECT id FROM transactions WHERE user_id = $1",
        serde_json::json!([]),
    );
    assert!(matches!(
        validate_report_query(&r, 42),
        Err(QueryRejected::OwnerParamMismatch { .. })
    ));
}

#[test]
fn non_numeric_first_param_is_rejected() {
    let r = report(
        "SELECT id FROM transactions WHERE user_id = $1",
        serde_json::json!(["42 OR 1=1"]),
    );
    assert!(matches!(
        validate_report_query(&r, 42),
        Err(QueryRejected::OwnerParamMismatch { .. })
    ));
}

// -- parse_report_query --

#[test]
fn oracle_json_parses_into_report_query() {
    let text = r#"{
        "query": "SELECT total_amount FROM transactions WHERE user_id = $1 ORDER BY created_at DESC LIMIT 5;",
        "params": ["42", "income"]
    }"#;
    let r = parse_report_query(text).expect("should parse");
    assert!(r.query.starts_with("SELECT"));
    assert_eq!(r.params.len(), 2);
}

#[test]
fn fenced_oracle_json_parses() {
    let text = "```json\n{\"query\": \"SELECT 1 FROM transactions WHERE user_id = $1\", \"params\": [3]}\n```";
    let r = parse_report_query(text).expect("should parse");
    assert_eq!(r.params[0], 3);
}

#[test]
fn bare_sql_without_json_is_rejected() {
    assert!(parse_report_query("SELECT * FROM transactions").is_err());
}
