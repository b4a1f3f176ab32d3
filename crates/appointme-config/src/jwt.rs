//! Signed-token configuration.
//!
//! # Environment Variables
//!
//! - `JWT_SECRET`: standard base64 HMAC key, at least 256 bits once decoded (required)
//! - `JWT_EXPIRATION_MS`: token lifetime in milliseconds (default: 86400000, 24 hours,
//!   at most 3650 days)

use chrono::Duration;
use data_encoding::BASE64;

use crate::error::ConfigError;
use crate::{check_lifetime, env_parse, lifetime_from_ms};

/// Minimum decoded key length for HS256.
pub const MIN_SECRET_BYTES: usize = 32;

const DEFAULT_EXPIRATION_MS: i64 = 86_400_000;

#[derive(Clone)]
pub struct JwtConfig {
    secret: Vec<u8>,
    pub expiration: Duration,
}

impl JwtConfig {
    /// Decodes `secret_base64` and checks its length and the lifetime bounds.
    pub fn new(secret_base64: &str, expiration: Duration) -> Result<Self, ConfigError> {
        let secret = BASE64.decode(secret_base64.trim().as_bytes())?;

        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::SecretTooShort {
                bits: secret.len() * 8,
                min_bits: MIN_SECRET_BYTES * 8,
            });
        }

        let expiration = check_lifetime("JWT_EXPIRATION_MS", expiration)?;

        Ok(Self { secret, expiration })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        let expiration = match env_parse::<i64>("JWT_EXPIRATION_MS") {
            Some(ms) => lifetime_from_ms("JWT_EXPIRATION_MS", ms)?,
            None => Duration::milliseconds(DEFAULT_EXPIRATION_MS),
        };

        Self::new(&secret, expiration)
    }

    /// Raw key material.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(raw: &[u8]) -> String {
        BASE64.encode(raw)
    }

    #[test]
    fn test_accepts_256_bit_secret() {
        let config = JwtConfig::new(
            &encode(b"ThisIsAVerySecretKeyForTesting12"),
            Duration::hours(1),
        )
        .unwrap();

        assert_eq!(config.secret().len(), 32);
        assert_eq!(config.expiration, Duration::hours(1));
    }

    #[test]
    fn test_rejects_short_secret() {
        let err = JwtConfig::new(&encode(b"too-short"), Duration::hours(1)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::SecretTooShort {
                bits: 72,
                min_bits: 256
            }
        ));
    }

    #[test]
    fn test_rejects_non_base64_secret() {
        let err = JwtConfig::new("not base64 at all!!", Duration::hours(1)).unwrap_err();
        assert!(matches!(err, ConfigError::SecretNotBase64(_)));
    }

    #[test]
    fn test_rejects_non_positive_expiration() {
        let err = JwtConfig::new(
            &encode(b"ThisIsAVerySecretKeyForTesting12"),
            Duration::zero(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_rejects_oversized_expiration() {
        let err = JwtConfig::new(
            &encode(b"ThisIsAVerySecretKeyForTesting12"),
            Duration::milliseconds(9_000_000_000_000_000_000),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "JWT_EXPIRATION_MS",
                ..
            }
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = JwtConfig::new(
            &encode(b"ThisIsAVerySecretKeyForTesting12"),
            Duration::hours(1),
        )
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("ThisIsAVerySecret"));
        assert!(debug.contains("<redacted>"));
    }
}
