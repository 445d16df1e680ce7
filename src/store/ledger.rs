//! Atomic persistence of a transaction and its line items.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use crate::types::{LineItemDraft, RecordedEntry, TransactionDraft};

use super::{classify_write_error, StoreError};

/// Total amount of a draft: Σ(quantity × unit price), rounded to 2 places.
///
/// The caller-supplied payload never carries a total; it is always derived
/// here so the stored invariant `total_amount == Σ(quantity × unit_price)`
/// holds by construction.
pub fn compute_total(items: &[LineItemDraft]) -> Decimal {
    let mut total = items
        .iter()
        .map(|item| item.quantity.saturating_mul(item.unit_price))
        .fold(Decimal::ZERO, |acc, line| acc.saturating_add(line))
        .round_dp(2);
    // Pin the scale so 35 renders as 35.00 everywhere it surfaces.
    total.rescale(2);
    total
}

/// Persist a transaction entry and all of its line items as one unit.
///
/// Runs inside a single database transaction: the entry row and every item
/// row commit together or not at all. On any failure mid-write the sqlx
/// transaction guard rolls back before the error propagates.
///
/// # Errors
///
/// Returns [`StoreError::WriteConflict`] on constraint violations,
/// [`StoreError::Unavailable`] on connectivity failure.
pub async fn record_entry(
    pool: &PgPool,
    user_id: i64,
    draft: &TransactionDraft,
) -> Result<RecordedEntry, StoreError> {
    let total = compute_total(&draft.items);
    let description = draft.items.first().map(|item| item.item_name.clone());

    let mut tx = pool.begin().await.map_err(StoreError::Unavailable)?;

    let (entry_id,): (i64,) = sqlx::query_as(
        "INSERT INTO transactions (user_id, total_amount, kind, description) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id",
    )
    .bind(user_id)
    .bind(total)
    .bind(draft.kind.as_str())
    .bind(&description)
    .fetch_one(&mut *tx)
    .await
    .map_err(classify_write_error)?;

    for item in &draft.items {
        sqlx::query(
            "INSERT INTO transaction_items (transaction_id, item_name, quantity, unit_price) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(entry_id)
        .bind(&item.item_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .execute(&mut *tx)
        .await
        .map_err(classify_write_error)?;
    }

    tx.commit().await.map_err(StoreError::Unavailable)?;

    info!(
        entry_id,
        user_id,
        kind = draft.kind.as_str(),
        total = %total,
        items = draft.items.len(),
        "ledger entry recorded"
    );

    Ok(RecordedEntry {
        id: entry_id,
        kind: draft.kind,
        total_amount: total,
        description,
    })
}
