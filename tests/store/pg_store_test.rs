//! Tests for `src/store/` against a real Postgres.
//!
//! Ignored by default; run with a scratch database:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

use khata::store::{LedgerStore, PgStore, StoreError};
use khata::types::{EntryKind, LineItemDraft, ReportQuery, TransactionDraft};
use rust_decimal::Decimal;

async fn setup_store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for store tests");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("pool should connect");
    let store = PgStore::from_pool(pool);
    store.migrate().await.expect("migration should apply");
    store
}

/// Contact handles are unique per test run so reruns don't collide.
fn unique_handle(tag: u32) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("+91{tag}{nanos}")
}

fn item(name: &str, quantity: &str, price: &str) -> LineItemDraft {
    LineItemDraft {
        item_name: name.to_owned(),
        quantity: quantity.parse().expect("valid quantity"),
        unit_price: price.parse().expect("valid price"),
    }
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn find_or_create_user_is_idempotent() {
    let store = setup_store().await;
    let handle = unique_handle(1);

    let first = store.find_or_create_user(&handle).await.expect("first call");
    let second = store.find_or_create_user(&handle).await.expect("second call");
    assert_eq!(first, second);

    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM users WHERE phone_number = $1")
        .bind(&handle)
        .fetch_one(store.pool())
        .await
        .expect("count should succeed");
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn racing_first_contact_creates_one_user() {
    let store = setup_store().await;
    let handle = unique_handle(2);

    let (a, b) = tokio::join!(
        store.find_or_create_user(&handle),
        store.find_or_create_user(&handle)
    );
    let a = a.expect("first racer");
    let b = b.expect("second racer");
    assert_eq!(a, b, "both racers must resolve to the same user");

    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM users WHERE phone_number = $1")
        .bind(&handle)
        .fetch_one(store.pool())
        .await
        .expect("count should succeed");
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn record_entry_persists_total_and_items_atomically() {
    let store = setup_store().await;
    let handle = unique_handle(3);
    let user_id = store.find_or_create_user(&handle).await.expect("user");

    let draft = TransactionDraft {
        kind: EntryKind::Expense,
        items: vec![item("milkshake", "2", "10"), item("coffee", "1", "15")],
    };
    let entry = store.record_entry(user_id, &draft).await.expect("record");
    assert_eq!(entry.total_amount.to_string(), "35.00");
    assert_eq!(entry.description.as_deref(), Some("milkshake"));

    let (total,): (Decimal,) =
        sqlx::query_as("SELECT total_amount FROM transactions WHERE id = $1")
            .bind(entry.id)
            .fetch_one(store.pool())
            .await
            .expect("entry row should exist");
    assert_eq!(total, entry.total_amount);

    let (items,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM transaction_items WHERE transaction_id = $1")
            .bind(entry.id)
            .fetch_one(store.pool())
            .await
            .expect("item count should succeed");
    assert_eq!(items, 2);
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn invalid_item_rolls_back_the_whole_entry() {
    let store = setup_store().await;
    let handle = unique_handle(4);
    let user_id = store.find_or_create_user(&handle).await.expect("user");

    // Zero quantity violates the check constraint on transaction_items;
    // the transactions row inserted before it must roll back too.
    let draft = TransactionDraft {
        kind: EntryKind::Expense,
        items: vec![item("valid", "1", "10"), item("broken", "0", "10")],
    };
    let err = store
        .record_entry(user_id, &draft)
        .await
        .expect_err("should fail on check violation");
    assert!(matches!(err, StoreError::WriteConflict(_)), "got: {err}");

    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(store.pool())
            .await
            .expect("count should succeed");
    assert_eq!(count, 0, "no partial entry may remain");
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn run_report_binds_parameters_and_returns_text_rows() {
    let store = setup_store().await;
    let handle = unique_handle(5);
    let user_id = store.find_or_create_user(&handle).await.expect("user");

    let draft = TransactionDraft {
        kind: EntryKind::Income,
        items: vec![item("salary", "1", "5000")],
    };
    store.record_entry(user_id, &draft).await.expect("record");

    let report = ReportQuery {
        query: "SELECT total_amount, kind FROM transactions WHERE user_id = $1 AND kind = $2"
            .to_owned(),
        params: vec![
            serde_json::json!(user_id.to_string()),
            serde_json::json!("income"),
        ],
    };
    let rows = store.run_report(&report, user_id).await.expect("report");
    assert_eq!(rows.len(), 1);
    // NUMERIC surfaces as a string, ready for decimal re-parsing.
    assert_eq!(rows[0]["total_amount"], "5000.00");
    assert_eq!(rows[0]["kind"], "income");
}

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn run_report_distinguishes_bad_sql_from_unavailability() {
    let store = setup_store().await;
    let handle = unique_handle(6);
    let user_id = store.find_or_create_user(&handle).await.expect("user");

    let report = ReportQuery {
        query: "SELECT no_such_column FROM transactions WHERE user_id = $1".to_owned(),
        params: vec![serde_json::json!(user_id)],
    };
    let err = store
        .run_report(&report, user_id)
        .await
        .expect_err("should fail");
    assert!(matches!(err, StoreError::Query(_)), "got: {err}");
}
