//! Principals and the lookup that resolves them.

use async_trait::async_trait;
use serde::Serialize;

/// The account a signed token resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: i64,
    /// Login identifier; signed-token subjects are compared against it.
    pub username: String,
    pub authorities: Vec<String>,
    /// Email verified.
    pub enabled: bool,
    pub locked: bool,
}

/// Resolves a token subject to the current principal.
///
/// `Ok(None)` means the account does not exist. `Err` means the backing store
/// could not answer.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn find_principal(&self, subject: &str) -> anyhow::Result<Option<Principal>>;
}
