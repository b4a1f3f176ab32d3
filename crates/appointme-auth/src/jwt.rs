//! JWT (JSON Web Token) codec.
//!
//! Issues and parses the signed bearer tokens clients present on every
//! protected request. Tokens are HS256 compact JWS strings carrying:
//!
//! - `sub`: the principal's username (email)
//! - `iat` / `exp`: issue and expiry instants, Unix seconds
//! - `authorities`: the principal's authority names
//! - any extra claims supplied at issue time (e.g. `fullName`)
//!
//! Expiry is evaluated against an injected [`Clock`] rather than the
//! `jsonwebtoken` validator's wall clock, so it can be exercised in tests.
//! A token is expired from the instant `now == exp` onward. Both claims are
//! whole seconds truncated from the issue instant, so a token issued part
//! way through a second expires up to one second before `issue + lifetime`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use appointme_auth::TokenCodec;
//! use appointme_config::JwtConfig;
//! use appointme_core::SystemClock;
//!
//! let codec = TokenCodec::new(&JwtConfig::from_env()?, Arc::new(SystemClock));
//!
//! let token = codec.issue("alice@example.com", Default::default(), &["USER".into()])?;
//! assert_eq!(codec.parse_subject(&token)?, "alice@example.com");
//! ```

use std::sync::Arc;

use appointme_config::JwtConfig;
use appointme_core::Clock;
use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::{Map, Value};

use crate::claims::{Claims, RESERVED_CLAIMS};
use crate::error::TokenError;
use crate::principal::Principal;

/// Read side of the codec, as seen by the request authenticator.
pub trait TokenVerifier: Send + Sync {
    /// Verifies signature and expiry and returns every claim.
    fn decode(&self, token: &str) -> Result<Claims, TokenError>;

    /// `Ok(true)` iff the token's subject is `principal`'s username
    /// (case-insensitive) and the token has not expired.
    ///
    /// # Errors
    ///
    /// Parse failures, expiry included, are returned rather than folded into
    /// `Ok(false)`.
    fn is_valid(&self, token: &str, principal: &Principal) -> Result<bool, TokenError>;
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against `clock` in `decode`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret()),
            decoding_key: DecodingKey::from_secret(config.secret()),
            validation,
            lifetime: config.expiration,
            clock,
        }
    }

    /// Creates a signed token for `subject`.
    ///
    /// `extra` claims are embedded as-is except for the reserved keys
    /// (`sub`, `iat`, `exp`, `authorities`), which the codec always sets
    /// itself.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encoding`] for a blank subject, an expiry that
    /// does not fit a timestamp, or if signing fails.
    pub fn issue(
        &self,
        subject: &str,
        mut extra: Map<String, Value>,
        authorities: &[String],
    ) -> Result<String, TokenError> {
        if subject.trim().is_empty() {
            return Err(TokenError::Encoding("subject must not be blank".to_string()));
        }

        for key in RESERVED_CLAIMS {
            extra.remove(key);
        }

        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| TokenError::Encoding("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            authorities: authorities.to_vec(),
            extra,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Returns the token's subject.
    ///
    /// # Errors
    ///
    /// [`TokenError::Malformed`] if the structure or signature is invalid,
    /// [`TokenError::Expired`] if the token is past its expiry.
    pub fn parse_subject(&self, token: &str) -> Result<String, TokenError> {
        self.extract_claim(token, |claims| claims.sub.clone())
    }

    /// Applies `selector` to the verified claim set.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let expires_at = codec.extract_claim(&token, |c| c.exp)?;
    /// let full_name: Option<String> = codec.extract_claim(&token, |c| c.claim("fullName"))?;
    /// ```
    pub fn extract_claim<T, F>(&self, token: &str, selector: F) -> Result<T, TokenError>
    where
        F: FnOnce(&Claims) -> T,
    {
        let claims = TokenVerifier::decode(self, token)?;
        Ok(selector(&claims))
    }
}

impl TokenVerifier for TokenCodec {
    fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected signed token");
                TokenError::Malformed
            })?;

        if claims.is_expired_at(self.clock.now()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn is_valid(&self, token: &str, principal: &Principal) -> Result<bool, TokenError> {
        let subject = self.parse_subject(token)?;
        Ok(subject.to_lowercase() == principal.username.to_lowercase())
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("lifetime", &self.lifetime)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
