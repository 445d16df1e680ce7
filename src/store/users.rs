//! User lookup-or-create keyed on the contact handle.

use sqlx::PgPool;
use tracing::{debug, info};

use super::{classify_write_error, StoreError};

/// Find a user by contact handle, creating one if absent.
///
/// Create-then-lookup: the insert carries `ON CONFLICT (phone_number) DO
/// NOTHING`, so when two first-contact messages race, one insert wins and
/// the loser falls through to the select. The uniqueness constraint is the
/// whole synchronization story; no application lock.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the store cannot be reached.
pub async fn find_or_create(pool: &PgPool, contact_handle: &str) -> Result<i64, StoreError> {
    let inserted: Option<(i64,)> = sqlx::query_as(
        "INSERT INTO users (phone_number, display_name) \
         VALUES ($1, $2) \
         ON CONFLICT (phone_number) DO NOTHING \
         RETURNING id",
    )
    .bind(contact_handle)
    .bind(default_display_name(contact_handle))
    .fetch_optional(pool)
    .await
    .map_err(classify_write_error)?;

    if let Some((id,)) = inserted {
        info!(user_id = id, "created new user");
        return Ok(id);
    }

    let (id,): (i64,) = sqlx::query_as("SELECT id FROM users WHERE phone_number = $1")
        .bind(contact_handle)
        .fetch_one(pool)
        .await
        .map_err(StoreError::Unavailable)?;
    debug!(user_id = id, "resolved existing user");
    Ok(id)
}

/// Default display name for a user created on first contact.
fn default_display_name(contact_handle: &str) -> String {
    contact_handle.to_owned()
}
