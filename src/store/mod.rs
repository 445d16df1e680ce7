//! Postgres persistence: users, ledger entries, and report execution.
//!
//! All access goes through the [`LedgerStore`] trait so the pipeline can be
//! exercised against an in-memory double. The production implementation is
//! [`PgStore`], a thin wrapper over a bounded [`sqlx::PgPool`]; the schema
//! is applied at startup from `migrations/001_schema.sql`.

pub mod ledger;
pub mod report;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::types::{RecordedEntry, ReportQuery, ReportRow, TransactionDraft};

/// Errors from store operations.
///
/// The split matters to the orchestrator: [`StoreError::WriteConflict`] is
/// retried once, [`StoreError::Query`] produces an apology without touching
/// anything else, and [`StoreError::Unavailable`] is fatal for the message.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// A write hit a constraint or serialization conflict.
    #[error("write conflict: {0}")]
    WriteConflict(#[source] sqlx::Error),

    /// The store rejected or timed out a read query.
    #[error("query execution failed: {0}")]
    Query(#[source] sqlx::Error),
}

/// Whether an sqlx error means the store itself is unreachable.
fn is_connectivity(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
    )
}

/// Classify an error raised during a write.
///
/// Integrity violations (SQLSTATE class 23) and serialization failures
/// (40001, 40P01) are conflicts; connectivity failures are fatal.
pub(crate) fn classify_write_error(error: sqlx::Error) -> StoreError {
    if is_connectivity(&error) {
        return StoreError::Unavailable(error);
    }
    if let sqlx::Error::Database(db) = &error {
        if let Some(code) = db.code() {
            if code.starts_with("23") || code == "40001" || code == "40P01" {
                return StoreError::WriteConflict(error);
            }
        }
    }
    StoreError::Unavailable(error)
}

/// Classify an error raised during a read.
pub(crate) fn classify_read_error(error: sqlx::Error) -> StoreError {
    if is_connectivity(&error) {
        StoreError::Unavailable(error)
    } else {
        StoreError::Query(error)
    }
}

/// Persistence interface the pipeline depends on.
///
/// Implementations must be `Send + Sync` for sharing across per-message
/// tasks.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Look up a user by contact handle, creating one if absent.
    ///
    /// Safe under concurrent first contact: two racing calls for the same
    /// new handle resolve to one user row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached.
    async fn find_or_create_user(&self, contact_handle: &str) -> Result<i64, StoreError>;

    /// Atomically persist a transaction and its line items.
    ///
    /// The entry total is computed here from the line items; either every
    /// row lands or none do.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteConflict`] on constraint violations
    /// (retryable once) or [`StoreError::Unavailable`] on connectivity
    /// failure.
    async fn record_entry(
        &self,
        user_id: i64,
        draft: &TransactionDraft,
    ) -> Result<RecordedEntry, StoreError>;

    /// Execute a validated report query and return untyped rows.
    ///
    /// Callers must have passed `report` through
    /// [`crate::query::validate_report_query`] first; `user_id` is bound as
    /// the first parameter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the store rejects the query,
    /// [`StoreError::Unavailable`] on connectivity failure.
    async fn run_report(
        &self,
        report: &ReportQuery,
        user_id: i64,
    ) -> Result<Vec<ReportRow>, StoreError>;
}

/// Postgres-backed [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a bounded pool using the given configuration and URL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the pool cannot connect.
    pub async fn connect(config: &DatabaseConfig, url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(url)
            .await
            .map_err(StoreError::Unavailable)?;
        info!(
            max_connections = config.max_connections,
            "database pool created"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by integration tests).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the schema migration. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the DDL cannot be applied.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let schema = include_str!("../../migrations/001_schema.sql");
        sqlx::raw_sql(schema)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Unavailable)?;
        info!("schema migration applied");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn find_or_create_user(&self, contact_handle: &str) -> Result<i64, StoreError> {
        users::find_or_create(&self.pool, contact_handle).await
    }

    async fn record_entry(
        &self,
        user_id: i64,
        draft: &TransactionDraft,
    ) -> Result<RecordedEntry, StoreError> {
        ledger::record_entry(&self.pool, user_id, draft).await
    }

    async fn run_report(
        &self,
        report: &ReportQuery,
        user_id: i64,
    ) -> Result<Vec<ReportRow>, StoreError> {
        report::run_report(&self.pool, report, user_id).await
    }
}
