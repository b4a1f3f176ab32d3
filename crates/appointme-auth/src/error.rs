use appointme_core::AppError;
use thiserror::Error;

/// Signed-token failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Bad structure, bad signature, or a missing `sub`/`exp`.
    #[error("malformed token")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Encoding(String),
}

/// Failures the request authenticator propagates instead of passing through.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token names a principal that no longer exists.
    #[error("no account exists for the presented token")]
    PrincipalNotFound,

    #[error("identity lookup unavailable: {0}")]
    IdentityLookupUnavailable(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => AppError::unauthorized("Invalid token"),
            TokenError::Expired => AppError::unauthorized("Token has expired"),
            TokenError::Encoding(_) => AppError::internal(err),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::PrincipalNotFound => AppError::unauthorized(err.to_string()),
            AuthError::IdentityLookupUnavailable(_) => AppError::service_unavailable(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appointme_core::errors::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::from(TokenError::Malformed).status, StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(TokenError::Expired).status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::from(TokenError::Encoding("x".into())).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(AuthError::PrincipalNotFound).status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AuthError::IdentityLookupUnavailable("down".into())).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
