//! User persistence and the [`IdentityLookup`] adapter the request
//! authenticator resolves subjects through.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use appointme_auth::{IdentityLookup, Principal};
use appointme_db::{PgPool, StoreError, with_timeout};
use async_trait::async_trait;
use tracing::instrument;

use super::model::{DEFAULT_ROLE, NewUser, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Case-insensitive email match.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Inserts an unverified, unlocked account holding [`DEFAULT_ROLE`].
    /// An email already taken (in any case) is [`StoreError::Duplicate`].
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn mark_email_verified(&self, id: i64) -> Result<(), StoreError>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError>;
}

const SELECT_USER: &str = r#"
    SELECT u.id, u.first_name, u.last_name, u.email, u.password, u.email_verified, u.locked,
           u.created_at, u.updated_at,
           COALESCE(array_agg(r.name ORDER BY r.name) FILTER (WHERE r.name IS NOT NULL), '{}') AS roles
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
"#;

pub struct PgUserRepository {
    db: PgPool,
    timeout: Duration,
}

impl PgUserRepository {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("{SELECT_USER} WHERE LOWER(u.email) = LOWER($1) GROUP BY u.id");

        with_timeout(self.timeout, async {
            let user = sqlx::query_as::<_, User>(&sql)
                .bind(email)
                .fetch_optional(&self.db)
                .await?;
            Ok::<_, StoreError>(user)
        })
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("{SELECT_USER} WHERE u.id = $1 GROUP BY u.id");

        with_timeout(self.timeout, async {
            let user = sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
            Ok::<_, StoreError>(user)
        })
        .await
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let id = with_timeout(self.timeout, async {
            let mut tx = self.db.begin().await?;

            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO users (first_name, last_name, email, password)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&mut *tx)
            .await?;

            let granted = sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                SELECT $1, id FROM roles WHERE name = $2
                "#,
            )
            .bind(id)
            .bind(DEFAULT_ROLE)
            .execute(&mut *tx)
            .await?;

            if granted.rows_affected() == 0 {
                tracing::error!(role = DEFAULT_ROLE, "Default role is missing from roles table");
                return Err(StoreError::Database(sqlx::Error::RowNotFound));
            }

            tx.commit().await?;
            Ok::<_, StoreError>(id)
        })
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn mark_email_verified(&self, id: i64) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            sqlx::query("UPDATE users SET email_verified = TRUE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.db)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.db)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}

/// Resolves signed-token subjects (emails) to principals through a
/// [`UserRepository`].
pub struct UserIdentityLookup {
    users: Arc<dyn UserRepository>,
}

impl UserIdentityLookup {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl IdentityLookup for UserIdentityLookup {
    async fn find_principal(&self, subject: &str) -> anyhow::Result<Option<Principal>> {
        let user = self
            .users
            .find_by_email(subject)
            .await
            .context("user lookup failed")?;

        Ok(user.as_ref().map(User::to_principal))
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryUserRepository;

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    #[derive(Debug, Default)]
    pub struct InMemoryUserRepository {
        users: Mutex<Vec<User>>,
    }

    impl InMemoryUserRepository {
        pub fn new() -> Self {
            Self::default()
        }

        fn users(&self) -> std::sync::MutexGuard<'_, Vec<User>> {
            self.users.lock().unwrap_or_else(|e| e.into_inner())
        }

        /// Locks or unlocks an account.
        pub fn set_locked(&self, id: i64, locked: bool) {
            if let Some(user) = self.users().iter_mut().find(|u| u.id == id) {
                user.locked = locked;
            }
        }
    }

    #[async_trait]
    impl UserRepository for InMemoryUserRepository {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            Ok(self
                .users()
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned())
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
            Ok(self.users().iter().find(|u| u.id == id).cloned())
        }

        async fn create(&self, user: NewUser) -> Result<User, StoreError> {
            let mut users = self.users();
            if users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
                return Err(StoreError::Duplicate);
            }

            let now = Utc::now();
            let record = User {
                id: users.len() as i64 + 1,
                first_name: user.first_name,
                last_name: user.last_name,
                email: user.email,
                password: user.password_hash,
                email_verified: false,
                locked: false,
                created_at: now,
                updated_at: now,
                roles: vec![DEFAULT_ROLE.to_string()],
            };
            users.push(record.clone());
            Ok(record)
        }

        async fn mark_email_verified(&self, id: i64) -> Result<(), StoreError> {
            if let Some(user) = self.users().iter_mut().find(|u| u.id == id) {
                user.email_verified = true;
                user.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
            if let Some(user) = self.users().iter_mut().find(|u| u.id == id) {
                user.password = password_hash.to_string();
                user.updated_at = Utc::now();
            }
            Ok(())
        }
    }
}
