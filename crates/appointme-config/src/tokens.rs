//! Single-use token settings.
//!
//! # Environment Variables
//!
//! - `ACTIVATION_TOKEN_LENGTH`: characters per token (default: 32, minimum: 16)
//! - `ACTIVATION_TOKEN_EXPIRATION_MS`: email verification lifetime (default: 900000, 15 minutes)
//! - `PASSWORD_RESET_TOKEN_EXPIRATION_MS`: password reset lifetime (default: 900000)
//!
//! A lifetime that is set must be positive and at most 3650 days.

use chrono::Duration;

use crate::error::ConfigError;
use crate::{env_parse, lifetime_from_ms};

const DEFAULT_LENGTH: usize = 32;
const MIN_LENGTH: usize = 16;
const DEFAULT_EXPIRATION_MS: i64 = 900_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingleUseTokenConfig {
    pub length: usize,
    pub activation_lifetime: Duration,
    pub password_reset_lifetime: Duration,
}

impl Default for SingleUseTokenConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            activation_lifetime: Duration::milliseconds(DEFAULT_EXPIRATION_MS),
            password_reset_lifetime: Duration::milliseconds(DEFAULT_EXPIRATION_MS),
        }
    }
}

impl SingleUseTokenConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let lifetime = |key: &'static str| match env_parse::<i64>(key) {
            Some(ms) => lifetime_from_ms(key, ms),
            None => Ok(Duration::milliseconds(DEFAULT_EXPIRATION_MS)),
        };

        Ok(Self {
            length: env_parse::<usize>("ACTIVATION_TOKEN_LENGTH")
                .unwrap_or(DEFAULT_LENGTH)
                .max(MIN_LENGTH),
            activation_lifetime: lifetime("ACTIVATION_TOKEN_EXPIRATION_MS")?,
            password_reset_lifetime: lifetime("PASSWORD_RESET_TOKEN_EXPIRATION_MS")?,
        })
    }
}
