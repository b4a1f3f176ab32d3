//! Request security settings.
//!
//! # Environment Variables
//!
//! - `SECURITY_PUBLIC_PATHS`: comma-separated route patterns that skip bearer
//!   inspection entirely. A trailing `/**` makes the pattern a prefix match;
//!   anything else must match the whole path.
//!   Default: `/api/v1/auth/**,/health,/api-docs/**`
//! - `AUTH_IO_TIMEOUT_MS`: upper bound for identity lookups and token store
//!   calls (default: 5000)
//! - `BCRYPT_COST`: bcrypt work factor for new password hashes (default: 12)

use std::time::Duration;

use crate::env_parse;

const DEFAULT_PUBLIC_PATHS: &str = "/api/v1/auth/**,/health,/api-docs/**";
const DEFAULT_IO_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_BCRYPT_COST: u32 = 12;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityConfig {
    pub public_paths: Vec<String>,
    pub io_timeout: Duration,
    pub bcrypt_cost: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            public_paths: parse_patterns(DEFAULT_PUBLIC_PATHS),
            io_timeout: Duration::from_millis(DEFAULT_IO_TIMEOUT_MS),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl SecurityConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let public_paths = std::env::var("SECURITY_PUBLIC_PATHS")
            .map(|raw| parse_patterns(&raw))
            .unwrap_or_else(|_| parse_patterns(DEFAULT_PUBLIC_PATHS));

        Self {
            public_paths,
            io_timeout: Duration::from_millis(
                env_parse("AUTH_IO_TIMEOUT_MS").unwrap_or(DEFAULT_IO_TIMEOUT_MS),
            ),
            bcrypt_cost: env_parse::<u32>("BCRYPT_COST")
                .filter(|cost| (4..=31).contains(cost))
                .unwrap_or(DEFAULT_BCRYPT_COST),
        }
    }

    /// Returns true when `path` needs no authentication at all.
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths
            .iter()
            .any(|pattern| pattern_matches(pattern, path))
    }
}

fn parse_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix("/**") {
        // "/api/v1/auth/**" covers "/api/v1/auth" and everything below it,
        // but not "/api/v1/authx".
        Some(prefix) => {
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        }
        None => pattern == path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(patterns: &str) -> SecurityConfig {
        SecurityConfig {
            public_paths: parse_patterns(patterns),
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn test_prefix_pattern() {
        let config = config("/api/v1/auth/**");

        assert!(config.is_public_path("/api/v1/auth"));
        assert!(config.is_public_path("/api/v1/auth/login"));
        assert!(config.is_public_path("/api/v1/auth/register"));
        assert!(config.is_public_path("/api/v1/auth/activate"));
        assert!(!config.is_public_path("/api/v1/authx"));
        assert!(!config.is_public_path("/api/v1/users"));
    }

    #[test]
    fn test_exact_pattern() {
        let config = config("/health");

        assert!(config.is_public_path("/health"));
        assert!(!config.is_public_path("/health/db"));
        assert!(!config.is_public_path("/healthz"));
    }

    #[test]
    fn test_default_patterns() {
        let config = SecurityConfig::default();

        assert!(config.is_public_path("/api/v1/auth/authenticate"));
        assert!(config.is_public_path("/health"));
        assert!(config.is_public_path("/api-docs/openapi.json"));
        assert!(!config.is_public_path("/api/v1/users/me"));
    }

    #[test]
    fn test_parse_patterns_skips_blanks() {
        assert_eq!(
            parse_patterns(" /a/** , ,/b "),
            vec!["/a/**".to_string(), "/b".to_string()]
        );
    }
}
