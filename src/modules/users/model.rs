use appointme_auth::Principal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Role granted to every self-registered account.
pub const DEFAULT_ROLE: &str = "User";

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub email_verified: bool,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Role names, aggregated from `user_roles`.
    pub roles: Vec<String>,
}

impl User {
    /// `"Last, First"`, dropping the comma when either part is blank.
    pub fn full_name(&self) -> String {
        let first = self.first_name.trim();
        let last = self.last_name.trim();

        match (last.is_empty(), first.is_empty()) {
            (false, false) => format!("{last}, {first}"),
            (false, true) => last.to_string(),
            (true, false) => first.to_string(),
            (true, true) => String::new(),
        }
    }

    pub fn to_principal(&self) -> Principal {
        Principal {
            id: self.id,
            username: self.email.clone(),
            authorities: self.roles.clone(),
            enabled: self.email_verified,
            locked: self.locked,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub email_verified: bool,
    /// Authorities carried by the presented token.
    pub authorities: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user: User, authorities: Vec<String>) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            email_verified: user.email_verified,
            authorities,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        let now = Utc::now();
        User {
            id: 7,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: "alice@example.com".to_string(),
            password: "hash".to_string(),
            email_verified: true,
            locked: false,
            created_at: now,
            updated_at: now,
            roles: vec![DEFAULT_ROLE.to_string()],
        }
    }

    #[test]
    fn test_full_name_formats_last_first() {
        assert_eq!(user("Alice", "Smith").full_name(), "Smith, Alice");
        assert_eq!(user(" Alice ", "").full_name(), "Alice");
        assert_eq!(user("", "Smith").full_name(), "Smith");
        assert_eq!(user(" ", " ").full_name(), "");
    }

    #[test]
    fn test_principal_uses_email_as_username() {
        let principal = user("Alice", "Smith").to_principal();

        assert_eq!(principal.id, 7);
        assert_eq!(principal.username, "alice@example.com");
        assert_eq!(principal.authorities, vec!["User".to_string()]);
        assert!(principal.enabled);
        assert!(!principal.locked);
    }
}
