//! Connection pool construction.
//!
//! A bounded pool sized from [`articlesmith_core::Config`], with acquire
//! timeout and idle/lifetime limits pinned to sane operational defaults
//! rather than re-derived from CPU count: the document store is one of
//! several gateways sharing the process, not the dominant resource
//! consumer a dedicated database host's pool sizing would reason about.

use std::time::Duration;

use articlesmith_core::{Config, Error, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Default time a caller waits for a pooled connection before failing with
/// `ErrRetrieval`. Store failures are never retried.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect to Postgres using `config.database_url`/`database_pool_size`,
/// then apply the schema (idempotent `CREATE ... IF NOT EXISTS`).
///
/// # Errors
/// Returns [`Error::Retrieval`] if the pool cannot be established or the
/// schema cannot be applied.
pub async fn connect(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_pool_size)
        .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .map_err(|e| Error::Retrieval(format!("failed to connect to document store: {e}")))?;
    crate::schema::apply(&pool).await?;
    Ok(pool)
}
