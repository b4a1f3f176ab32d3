use std::sync::Arc;

use appointme_config::SingleUseTokenConfig;
use appointme_core::Clock;
use appointme_db::StoreError;
use chrono::Duration;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use tracing::instrument;

use super::model::{
    ConsumeOutcome, IssuedToken, NewSingleUseToken, SingleUseToken, SingleUseTokenError,
    TokenPurpose, token_digest,
};
use super::store::TokenStore;

/// Digest collisions tolerated before giving up on an issue.
const MAX_GENERATION_ATTEMPTS: usize = 3;

/// Issues, consumes and reissues single-use tokens.
pub struct SingleUseTokenService {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    config: SingleUseTokenConfig,
}

impl SingleUseTokenService {
    pub fn new(
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        config: SingleUseTokenConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Configured lifetime for tokens of `purpose`.
    pub fn lifetime_for(&self, purpose: TokenPurpose) -> Duration {
        match purpose {
            TokenPurpose::EmailVerification => self.config.activation_lifetime,
            TokenPurpose::PasswordReset => self.config.password_reset_lifetime,
        }
    }

    /// Issues a token with the configured lifetime for `purpose`.
    pub async fn issue(
        &self,
        user_id: i64,
        purpose: TokenPurpose,
    ) -> Result<IssuedToken, SingleUseTokenError> {
        self.issue_with_lifetime(user_id, purpose, self.lifetime_for(purpose))
            .await
    }

    /// Generates a random value, persists its digest and returns the raw
    /// value for delivery.
    ///
    /// # Errors
    ///
    /// [`SingleUseTokenError::InvalidLifetime`] for a zero or negative
    /// lifetime, or one that overflows the expiry timestamp; store failures
    /// are passed through.
    #[instrument(skip(self))]
    pub async fn issue_with_lifetime(
        &self,
        user_id: i64,
        purpose: TokenPurpose,
        lifetime: Duration,
    ) -> Result<IssuedToken, SingleUseTokenError> {
        if lifetime <= Duration::zero() {
            return Err(SingleUseTokenError::InvalidLifetime);
        }

        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let value = generate_value(self.config.length);
            let now = self.clock.now();

            let expires_at = now
                .checked_add_signed(lifetime)
                .ok_or(SingleUseTokenError::InvalidLifetime)?;

            let new_token = NewSingleUseToken {
                user_id,
                token_hash: token_digest(&value),
                purpose,
                created_at: now,
                expires_at,
            };

            match self.store.insert(new_token).await {
                Ok(record) => {
                    tracing::info!(token_id = record.id, %purpose, "Issued single-use token");
                    return Ok(IssuedToken { value, record });
                }
                Err(StoreError::Duplicate) => {
                    tracing::warn!(%purpose, "Single-use token digest collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SingleUseTokenError::GenerationExhausted)
    }

    /// Presents a raw token value.
    ///
    /// Expired, never-consumed tokens are reissued for the same owner and
    /// purpose; the replacement is handed back for the caller to deliver.
    /// Store failures are the only `Err`.
    #[instrument(skip(self, value))]
    pub async fn consume(
        &self,
        value: &str,
        purpose: TokenPurpose,
    ) -> Result<ConsumeOutcome, SingleUseTokenError> {
        let token = match self.store.find_by_hash(&token_digest(value)).await? {
            Some(token) if token.purpose == purpose => token,
            _ => return Ok(ConsumeOutcome::Unknown),
        };

        if token.validated_at.is_some() {
            return Ok(ConsumeOutcome::AlreadyConsumed(token));
        }

        let now = self.clock.now();

        if !token.is_usable_at(now) {
            // Only the caller that moves `reissued_at` on from what it read
            // issues a replacement.
            let replacement = if self
                .store
                .mark_reissued(token.id, token.reissued_at, now)
                .await?
            {
                Some(self.issue(token.user_id, token.purpose).await?)
            } else {
                tracing::info!(token_id = token.id, "Expired token already reissued concurrently");
                None
            };

            return Ok(ConsumeOutcome::Expired { token, replacement });
        }

        if self.store.claim(token.id, now).await? {
            tracing::info!(token_id = token.id, %purpose, "Consumed single-use token");
            let mut token = token;
            token.validated_at = Some(now);
            Ok(ConsumeOutcome::Consumed(token))
        } else {
            Ok(ConsumeOutcome::AlreadyConsumed(token))
        }
    }

    /// Hands a token claimed by [`consume`](Self::consume) back to the store
    /// so the same value can be presented again. Used when the account write
    /// that the token authorised fails.
    #[instrument(skip(self, token), fields(token_id = token.id))]
    pub async fn release(&self, token: &SingleUseToken) -> Result<(), SingleUseTokenError> {
        let released = SingleUseToken {
            validated_at: None,
            ..token.clone()
        };
        self.store.save(&released).await?;

        tracing::warn!(purpose = %token.purpose, "Released single-use token claim");
        Ok(())
    }

    /// Rows ever issued to `user_id`.
    pub async fn count_for_owner(&self, user_id: i64) -> Result<i64, SingleUseTokenError> {
        Ok(self.store.count_for_owner(user_id).await?)
    }
}

fn generate_value(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
