//! Database Module
//!
//! SQLite connection pool, migrations and per-table query functions.

pub mod carts;
pub mod orders;
pub mod products;
pub mod users;
pub mod webhook_events;

use std::str::FromStr;
use std::time::Duration;

use sqlx::{Sqlite, SqlitePool, Transaction};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::BoxError;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Result type for query functions
pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Open the pool (WAL, foreign keys, 5s busy timeout) and apply migrations
pub async fn connect(database_url: &str) -> Result<SqlitePool, BoxError> {
    if database_url.contains(":memory:") {
        return connect_in_memory().await;
    }

    if let Some(path) = database_url.strip_prefix("sqlite:")
        && let Some(parent) = std::path::Path::new(path.trim_start_matches("//")).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    tracing::info!("Database connection established (SQLite WAL, busy_timeout=5000ms)");

    MIGRATOR.run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Single-connection in-memory database that lives as long as the pool
pub async fn connect_in_memory() -> Result<SqlitePool, BoxError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// Transaction that takes the write lock on `BEGIN`.
///
/// A deferred transaction that reads first cannot upgrade to a writer once
/// another connection has committed (SQLITE_BUSY_SNAPSHOT, not retried by the
/// busy timeout). Taking the lock up front makes concurrent writers queue on
/// the busy timeout, so they see committed stock and the conditional updates
/// decide the outcome.
pub async fn begin_write(pool: &SqlitePool) -> RepoResult<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// `true` for UNIQUE constraint violations
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
