//! # AppointMe DB
//!
//! Database pool and store-level errors for the AppointMe identity service.
//!
//! This crate provides connection pool initialization using SQLx with
//! PostgreSQL, the [`StoreError`] type shared by every repository, and
//! [`with_timeout`] which bounds a single store call.
//!
//! # Example
//!
//! ```ignore
//! use appointme_config::DatabaseConfig;
//! use appointme_db::init_db_pool;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = init_db_pool(&DatabaseConfig::from_env()?).await?;
//!     sqlx::migrate!("./migrations").run(&pool).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use appointme_config::DatabaseConfig;
use appointme_core::AppError;
use sqlx::postgres::PgPoolOptions;

// Re-export PgPool for convenience
pub use sqlx::PgPool;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Initializes a PostgreSQL connection pool.
///
/// The pool's acquire timeout bounds how long a request waits for a free
/// connection; when it elapses queries fail with [`sqlx::Error::PoolTimedOut`],
/// which [`StoreError`] surfaces as [`StoreError::Timeout`].
///
/// # Errors
///
/// Returns the underlying [`sqlx::Error`] if the first connection cannot be
/// established.
pub async fn init_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        "Database pool initialized"
    );

    Ok(pool)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("record already exists")]
    Duplicate,

    /// The store did not answer within its time budget.
    #[error("store operation timed out")]
    Timeout,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Duplicate
            }
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            _ => StoreError::Database(err),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AppError::conflict(err),
            StoreError::Timeout => AppError::service_unavailable(err),
            StoreError::Database(_) => AppError::internal(err),
        }
    }
}

/// Runs `fut`, turning an elapsed `budget` into [`StoreError::Timeout`].
pub async fn with_timeout<T, F>(budget: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(budget, fut)
        .await
        .map_err(|_| StoreError::Timeout)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use appointme_core::errors::StatusCode;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let value = with_timeout(Duration::from_millis(50), async { Ok::<_, StoreError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_with_timeout_elapses() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        })
        .await;

        assert!(matches!(result, Err(StoreError::Timeout)));
    }

    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Timeout
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn test_store_error_status_mapping() {
        assert_eq!(AppError::from(StoreError::Duplicate).status, StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(StoreError::Timeout).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(StoreError::Database(sqlx::Error::RowNotFound)).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
