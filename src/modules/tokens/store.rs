//! Persistence boundary for single-use tokens.
//!
//! Only [`SingleUseTokenService`](super::service::SingleUseTokenService)
//! reads or writes these rows. Rows are never deleted.

use std::time::Duration;

use appointme_db::{PgPool, StoreError, with_timeout};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{NewSingleUseToken, SingleUseToken, SingleUseTokenRow};

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Looks a token up by the digest of its raw value.
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<SingleUseToken>, StoreError>;

    /// Persists a new row. A digest collision is [`StoreError::Duplicate`].
    async fn insert(&self, token: NewSingleUseToken) -> Result<SingleUseToken, StoreError>;

    /// Writes every mutable column of `token`. Idempotent.
    async fn save(&self, token: &SingleUseToken) -> Result<(), StoreError>;

    /// Sets `validated_at` iff it is still null. Exactly one concurrent
    /// caller gets `true`.
    async fn claim(&self, id: i64, validated_at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Sets `reissued_at = at` iff it still equals `seen`. At most one
    /// concurrent caller per observed value gets `true`.
    async fn mark_reissued(
        &self,
        id: i64,
        seen: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn count_for_owner(&self, user_id: i64) -> Result<i64, StoreError>;
}

const COLUMNS: &str =
    "id, user_id, token_hash, purpose, created_at, expires_at, validated_at, reissued_at";

pub struct PgTokenStore {
    db: PgPool,
    timeout: Duration,
}

impl PgTokenStore {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<SingleUseToken>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM single_use_tokens WHERE token_hash = $1");

        with_timeout(self.timeout, async {
            let row = sqlx::query_as::<_, SingleUseTokenRow>(&sql)
                .bind(token_hash)
                .fetch_optional(&self.db)
                .await?;
            row.map(SingleUseToken::try_from).transpose()
        })
        .await
    }

    async fn insert(&self, token: NewSingleUseToken) -> Result<SingleUseToken, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO single_use_tokens (user_id, token_hash, purpose, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        );

        with_timeout(self.timeout, async {
            let row = sqlx::query_as::<_, SingleUseTokenRow>(&sql)
                .bind(token.user_id)
                .bind(&token.token_hash)
                .bind(token.purpose.as_str())
                .bind(token.created_at)
                .bind(token.expires_at)
                .fetch_one(&self.db)
                .await?;
            SingleUseToken::try_from(row)
        })
        .await
    }

    async fn save(&self, token: &SingleUseToken) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            sqlx::query(
                r#"
                UPDATE single_use_tokens
                SET expires_at = $2, validated_at = $3, reissued_at = $4
                WHERE id = $1
                "#,
            )
            .bind(token.id)
            .bind(token.expires_at)
            .bind(token.validated_at)
            .bind(token.reissued_at)
            .execute(&self.db)
            .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn claim(&self, id: i64, validated_at: DateTime<Utc>) -> Result<bool, StoreError> {
        with_timeout(self.timeout, async {
            let result = sqlx::query(
                r#"
                UPDATE single_use_tokens
                SET validated_at = $2
                WHERE id = $1 AND validated_at IS NULL AND expires_at >= $2
                "#,
            )
            .bind(id)
            .bind(validated_at)
            .execute(&self.db)
            .await?;
            Ok::<_, StoreError>(result.rows_affected() == 1)
        })
        .await
    }

    async fn mark_reissued(
        &self,
        id: i64,
        seen: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        with_timeout(self.timeout, async {
            let result = sqlx::query(
                r#"
                UPDATE single_use_tokens
                SET reissued_at = $3
                WHERE id = $1 AND validated_at IS NULL AND reissued_at IS NOT DISTINCT FROM $2
                "#,
            )
            .bind(id)
            .bind(seen)
            .bind(at)
            .execute(&self.db)
            .await?;
            Ok::<_, StoreError>(result.rows_affected() == 1)
        })
        .await
    }

    async fn count_for_owner(&self, user_id: i64) -> Result<i64, StoreError> {
        with_timeout(self.timeout, async {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM single_use_tokens WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_one(&self.db)
                    .await?;
            Ok::<_, StoreError>(count)
        })
        .await
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryTokenStore;

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;

    /// Process-local store with the same conditional-update semantics as the
    /// Postgres one.
    #[derive(Debug, Default)]
    pub struct InMemoryTokenStore {
        rows: Mutex<Vec<SingleUseToken>>,
        next_id: AtomicI64,
    }

    impl InMemoryTokenStore {
        pub fn new() -> Self {
            Self::default()
        }

        fn rows(&self) -> std::sync::MutexGuard<'_, Vec<SingleUseToken>> {
            self.rows.lock().unwrap_or_else(|e| e.into_inner())
        }

        /// Every row, oldest first.
        pub fn all(&self) -> Vec<SingleUseToken> {
            self.rows().clone()
        }
    }

    #[async_trait]
    impl TokenStore for InMemoryTokenStore {
        async fn find_by_hash(
            &self,
            token_hash: &str,
        ) -> Result<Option<SingleUseToken>, StoreError> {
            Ok(self
                .rows()
                .iter()
                .find(|t| t.token_hash == token_hash)
                .cloned())
        }

        async fn insert(&self, token: NewSingleUseToken) -> Result<SingleUseToken, StoreError> {
            let mut rows = self.rows();
            if rows.iter().any(|t| t.token_hash == token.token_hash) {
                return Err(StoreError::Duplicate);
            }

            let record = SingleUseToken {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                user_id: token.user_id,
                token_hash: token.token_hash,
                purpose: token.purpose,
                created_at: token.created_at,
                expires_at: token.expires_at,
                validated_at: None,
                reissued_at: None,
            };
            rows.push(record.clone());
            Ok(record)
        }

        async fn save(&self, token: &SingleUseToken) -> Result<(), StoreError> {
            if let Some(row) = self.rows().iter_mut().find(|t| t.id == token.id) {
                row.expires_at = token.expires_at;
                row.validated_at = token.validated_at;
                row.reissued_at = token.reissued_at;
            }
            Ok(())
        }

        async fn claim(&self, id: i64, validated_at: DateTime<Utc>) -> Result<bool, StoreError> {
            let mut rows = self.rows();
            match rows.iter_mut().find(|t| t.id == id) {
                Some(row) if row.validated_at.is_none() && row.expires_at >= validated_at => {
                    row.validated_at = Some(validated_at);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn mark_reissued(
            &self,
            id: i64,
            seen: Option<DateTime<Utc>>,
            at: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            let mut rows = self.rows();
            match rows.iter_mut().find(|t| t.id == id) {
                Some(row) if row.validated_at.is_none() && row.reissued_at == seen => {
                    row.reissued_at = Some(at);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn count_for_owner(&self, user_id: i64) -> Result<i64, StoreError> {
            Ok(self.rows().iter().filter(|t| t.user_id == user_id).count() as i64)
        }
    }
}
