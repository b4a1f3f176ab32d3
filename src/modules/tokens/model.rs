//! Single-use token records and outcomes.
//!
//! A single-use token is an opaque random string delivered out-of-band
//! (verification or reset link). Only its SHA-256 digest is persisted, so the
//! raw value cannot be recovered from storage.

use std::fmt;
use std::str::FromStr;

use appointme_core::AppError;
use appointme_db::StoreError;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::FromRow;

/// Client-facing message for an expired email verification token.
pub const ACTIVATION_EXPIRED_MESSAGE: &str =
    "Activation token has expired. A new token has been sent to the same email address";

/// Client-facing message for an expired password reset token.
pub const RESET_EXPIRED_MESSAGE: &str =
    "Password reset token has expired. A new token has been sent to the same email address";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email_verification" => Ok(TokenPurpose::EmailVerification),
            "password_reset" => Ok(TokenPurpose::PasswordReset),
            other => Err(format!("unknown token purpose: {other}")),
        }
    }
}

/// A persisted single-use token row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleUseToken {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub purpose: TokenPurpose,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set once, on successful consumption.
    pub validated_at: Option<DateTime<Utc>>,
    /// Most recent reissue-on-expiry.
    pub reissued_at: Option<DateTime<Utc>>,
}

impl SingleUseToken {
    /// Usable iff never consumed and `now <= expires_at`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.validated_at.is_none() && now <= self.expires_at
    }
}

/// Raw `single_use_tokens` row; `purpose` is stored as text.
#[derive(Debug, FromRow)]
pub(crate) struct SingleUseTokenRow {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    pub reissued_at: Option<DateTime<Utc>>,
}

impl TryFrom<SingleUseTokenRow> for SingleUseToken {
    type Error = StoreError;

    fn try_from(row: SingleUseTokenRow) -> Result<Self, Self::Error> {
        let purpose = row
            .purpose
            .parse()
            .map_err(|e: String| StoreError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            purpose,
            created_at: row.created_at,
            expires_at: row.expires_at,
            validated_at: row.validated_at,
            reissued_at: row.reissued_at,
        })
    }
}

/// Insert payload for a new token row.
#[derive(Debug, Clone)]
pub struct NewSingleUseToken {
    pub user_id: i64,
    pub token_hash: String,
    pub purpose: TokenPurpose,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued token: the raw value for delivery plus its stored row.
#[derive(Clone)]
pub struct IssuedToken {
    pub value: String,
    pub record: SingleUseToken,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("value", &"<redacted>")
            .field("record", &self.record)
            .finish()
    }
}

/// Result of presenting a single-use token.
#[derive(Debug)]
pub enum ConsumeOutcome {
    /// The token was claimed by this call.
    Consumed(SingleUseToken),
    /// Past expiry and never consumed. `replacement` is `None` only when a
    /// concurrent presentation of the same expired token already reissued.
    Expired {
        token: SingleUseToken,
        replacement: Option<IssuedToken>,
    },
    AlreadyConsumed(SingleUseToken),
    /// No token with that value and purpose.
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum SingleUseTokenError {
    #[error("Invalid token")]
    Unknown,

    #[error("{0}")]
    Expired(&'static str),

    #[error("Token has already been used")]
    AlreadyConsumed,

    #[error("token lifetime must be positive")]
    InvalidLifetime,

    #[error("could not generate a unique token value")]
    GenerationExhausted,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SingleUseTokenError> for AppError {
    fn from(err: SingleUseTokenError) -> Self {
        match err {
            SingleUseTokenError::Unknown => AppError::not_found(err),
            SingleUseTokenError::Expired(_) => AppError::bad_request(err),
            SingleUseTokenError::AlreadyConsumed => AppError::conflict(err),
            SingleUseTokenError::Store(store) => store.into(),
            SingleUseTokenError::InvalidLifetime | SingleUseTokenError::GenerationExhausted => {
                AppError::internal(err)
            }
        }
    }
}

/// Hex SHA-256 of a raw token value.
pub fn token_digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use appointme_core::errors::StatusCode;
    use chrono::Duration;

    #[test]
    fn test_purpose_round_trips_through_text() {
        for purpose in [TokenPurpose::EmailVerification, TokenPurpose::PasswordReset] {
            assert_eq!(purpose.as_str().parse::<TokenPurpose>(), Ok(purpose));
        }
        assert!("bogus".parse::<TokenPurpose>().is_err());
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let digest = token_digest("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(token_digest("abd"), digest);
    }

    #[test]
    fn test_usable_window_is_inclusive_of_expiry() {
        let created = Utc::now();
        let token = SingleUseToken {
            id: 1,
            user_id: 1,
            token_hash: token_digest("x"),
            purpose: TokenPurpose::EmailVerification,
            created_at: created,
            expires_at: created + Duration::minutes(15),
            validated_at: None,
            reissued_at: None,
        };

        assert!(token.is_usable_at(token.expires_at));
        assert!(!token.is_usable_at(token.expires_at + Duration::milliseconds(1)));
        assert!(
            !SingleUseToken {
                validated_at: Some(created),
                ..token
            }
            .is_usable_at(created)
        );
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |e: SingleUseTokenError| AppError::from(e).status;

        assert_eq!(status(SingleUseTokenError::Unknown), StatusCode::NOT_FOUND);
        assert_eq!(
            status(SingleUseTokenError::Expired(ACTIVATION_EXPIRED_MESSAGE)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(SingleUseTokenError::AlreadyConsumed), StatusCode::CONFLICT);
        assert_eq!(
            status(SingleUseTokenError::Store(StoreError::Timeout)),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_issued_token_debug_hides_value() {
        let now = Utc::now();
        let issued = IssuedToken {
            value: "SuperSecretValue".to_string(),
            record: SingleUseToken {
                id: 1,
                user_id: 1,
                token_hash: token_digest("SuperSecretValue"),
                purpose: TokenPurpose::PasswordReset,
                created_at: now,
                expires_at: now + Duration::minutes(1),
                validated_at: None,
                reissued_at: None,
            },
        };

        assert!(!format!("{issued:?}").contains("SuperSecretValue"));
    }
}
