//! Claim set carried by signed tokens.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved claim key holding the principal's authority names.
pub const AUTHORITIES_CLAIM: &str = "authorities";

/// Keys the codec owns. Caller-supplied claims with these names are dropped.
pub(crate) const RESERVED_CLAIMS: [&str; 4] = ["sub", "iat", "exp", AUTHORITIES_CLAIM];

/// Decoded JWT claims.
///
/// # Fields
///
/// - `sub`: principal identifier (the account email)
/// - `iat`: issued-at, Unix seconds
/// - `exp`: expiry, Unix seconds; `exp - iat` is the configured lifetime
/// - `authorities`: authority names, possibly empty
/// - `extra`: any other claim, e.g. `fullName`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub authorities: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Reads a custom claim, returning `None` when it is absent or has the
    /// wrong shape.
    pub fn claim<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.extra
            .get(name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// A token stops being valid at the instant its `exp` is reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_authorities_defaults_to_empty() {
        let claims: Claims =
            serde_json::from_value(json!({"sub": "a@b.c", "iat": 1, "exp": 2})).unwrap();
        assert!(claims.authorities.is_empty());
        assert!(claims.extra.is_empty());
    }

    #[test]
    fn test_custom_claims_are_flattened() {
        let claims: Claims = serde_json::from_value(json!({
            "sub": "a@b.c",
            "iat": 1,
            "exp": 2,
            "authorities": ["USER"],
            "fullName": "Smith, Alice"
        }))
        .unwrap();

        assert_eq!(claims.claim::<String>("fullName").as_deref(), Some("Smith, Alice"));
        assert_eq!(claims.claim::<i64>("fullName"), None);
        assert_eq!(claims.claim::<String>("missing"), None);
    }

    #[test]
    fn test_expiry_boundary() {
        let claims = Claims {
            sub: "a@b.c".to_string(),
            iat: 100,
            exp: 200,
            authorities: vec![],
            extra: Map::new(),
        };

        let at = |secs| DateTime::from_timestamp(secs, 0).unwrap();
        assert!(!claims.is_expired_at(at(199)));
        assert!(claims.is_expired_at(at(200)));
        assert!(claims.is_expired_at(at(201)));
    }
}
