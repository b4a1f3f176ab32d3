//! # AppointMe Config
//!
//! Configuration types for the AppointMe identity service.
//!
//! This crate provides configuration structures loaded from environment variables:
//!
//! - [`jwt`]: Signing secret and signed-token lifetime
//! - [`tokens`]: Single-use token length and lifetimes
//! - [`security`]: Public path allow list, I/O timeouts, bcrypt cost
//! - [`database`]: PostgreSQL pool settings
//! - [`email`]: SMTP and link-building settings
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//!
//! Only the signing secret is mandatory. Everything else falls back to a
//! default when unset or unparseable. Token lifetimes that are set must be
//! positive and at most [`MAX_TOKEN_LIFETIME_DAYS`].
//!
//! # Example
//!
//! ```ignore
//! use appointme_config::AppConfig;
//!
//! // Fails fast if JWT_SECRET is missing or decodes to fewer than 256 bits
//! let config = AppConfig::from_env()?;
//! ```

use chrono::Duration;

pub mod cors;
pub mod database;
pub mod email;
pub mod error;
pub mod jwt;
pub mod security;
pub mod tokens;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::ConfigError;
pub use jwt::JwtConfig;
pub use security::SecurityConfig;
pub use tokens::SingleUseTokenConfig;

/// Every configuration section the service needs at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub tokens: SingleUseTokenConfig,
    pub security: SecurityConfig,
    pub database: DatabaseConfig,
    pub email: EmailConfig,
    pub cors: CorsConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            jwt: JwtConfig::from_env()?,
            tokens: SingleUseTokenConfig::from_env()?,
            security: SecurityConfig::from_env(),
            database: DatabaseConfig::from_env()?,
            email: EmailConfig::from_env(),
            cors: CorsConfig::from_env(),
        })
    }
}

/// Longest lifetime a signed or single-use token may be configured with.
pub const MAX_TOKEN_LIFETIME_DAYS: i64 = 3650;

pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Rejects lifetimes that are not positive or exceed
/// [`MAX_TOKEN_LIFETIME_DAYS`].
pub(crate) fn check_lifetime(
    key: &'static str,
    lifetime: Duration,
) -> Result<Duration, ConfigError> {
    if lifetime <= Duration::zero() {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be positive".to_string(),
        });
    }

    if lifetime > Duration::days(MAX_TOKEN_LIFETIME_DAYS) {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("must be at most {MAX_TOKEN_LIFETIME_DAYS} days"),
        });
    }

    Ok(lifetime)
}

pub(crate) fn lifetime_from_ms(key: &'static str, ms: i64) -> Result<Duration, ConfigError> {
    let lifetime = Duration::try_milliseconds(ms).ok_or_else(|| ConfigError::Invalid {
        key,
        reason: "out of range".to_string(),
    })?;
    check_lifetime(key, lifetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifetime_bounds() {
        assert_eq!(
            lifetime_from_ms("KEY", 900_000).unwrap(),
            Duration::minutes(15)
        );
        assert!(check_lifetime("KEY", Duration::days(MAX_TOKEN_LIFETIME_DAYS)).is_ok());

        for ms in [0, -1, 9_000_000_000_000_000_000, i64::MIN] {
            assert!(matches!(
                lifetime_from_ms("KEY", ms),
                Err(ConfigError::Invalid { key: "KEY", .. })
            ));
        }
    }
}
