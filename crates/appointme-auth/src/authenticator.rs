//! Per-request bearer authentication.
//!
//! [`RequestAuthenticator::authenticate`] runs once for every inbound request
//! and decides whether the request carries a usable signed token:
//!
//! 1. Public path: pass through without touching the codec or the lookup.
//! 2. No `Authorization` header, or one not starting with exactly
//!    `"Bearer "`: pass through.
//! 3. Empty credential, unparseable or expired token, blank subject: pass
//!    through.
//! 4. Identity already established for this request: pass through.
//! 5. Look the subject up. A missing principal is an error
//!    ([`AuthError::PrincipalNotFound`]), as is a failing or slow lookup
//!    ([`AuthError::IdentityLookupUnavailable`]).
//! 6. Token not valid for that principal: pass through.
//! 7. Otherwise the request is authenticated.
//!
//! Passing through is not a rejection. Handlers that need an identity reject
//! the request themselves when none was established.

use std::net::SocketAddr;
use std::sync::Arc;

use appointme_config::SecurityConfig;
use serde::Serialize;

use crate::error::AuthError;
use crate::jwt::TokenVerifier;
use crate::principal::{IdentityLookup, Principal};

/// Literal prefix of a bearer `Authorization` header, trailing space included.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Request metadata recorded alongside an established identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestDetails {
    pub remote_addr: Option<SocketAddr>,
    pub session_id: Option<String>,
}

/// The identity a request runs under once authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub principal: Principal,
    /// Authorities carried by the token, not re-read from the lookup.
    pub authorities: Vec<String>,
    pub details: RequestDetails,
}

/// What the authenticator needs to know about an inbound request.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    pub path: &'a str,
    /// Raw `Authorization` header value; `None` when absent or not UTF-8.
    pub authorization: Option<&'a str>,
    pub already_authenticated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    PublicPath,
    NoCredential,
    UnusableCredential,
    AlreadyAuthenticated,
    NotValidForPrincipal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Passthrough(PassthroughReason),
    Authenticated(AuthenticatedIdentity),
}

impl AuthOutcome {
    pub fn identity(&self) -> Option<&AuthenticatedIdentity> {
        match self {
            AuthOutcome::Authenticated(identity) => Some(identity),
            AuthOutcome::Passthrough(_) => None,
        }
    }
}

pub struct RequestAuthenticator {
    security: SecurityConfig,
    verifier: Arc<dyn TokenVerifier>,
    lookup: Arc<dyn IdentityLookup>,
}

impl RequestAuthenticator {
    pub fn new(
        security: SecurityConfig,
        verifier: Arc<dyn TokenVerifier>,
        lookup: Arc<dyn IdentityLookup>,
    ) -> Self {
        Self {
            security,
            verifier,
            lookup,
        }
    }

    /// Runs the authentication state machine for one request.
    ///
    /// # Errors
    ///
    /// Only [`AuthError`]s are returned; every other failure becomes
    /// [`AuthOutcome::Passthrough`].
    pub async fn authenticate(
        &self,
        request: InboundRequest<'_>,
        details: RequestDetails,
    ) -> Result<AuthOutcome, AuthError> {
        use PassthroughReason::*;

        if self.security.is_public_path(request.path) {
            return Ok(AuthOutcome::Passthrough(PublicPath));
        }

        let Some(credential) = request
            .authorization
            .and_then(|header| header.strip_prefix(BEARER_PREFIX))
        else {
            return Ok(AuthOutcome::Passthrough(NoCredential));
        };

        if credential.is_empty() {
            return Ok(AuthOutcome::Passthrough(UnusableCredential));
        }

        let claims = match self.verifier.decode(credential) {
            Ok(claims) if !claims.sub.trim().is_empty() => claims,
            Ok(_) => return Ok(AuthOutcome::Passthrough(UnusableCredential)),
            Err(e) => {
                tracing::debug!(error = %e, path = request.path, "Ignoring unusable bearer token");
                return Ok(AuthOutcome::Passthrough(UnusableCredential));
            }
        };

        if request.already_authenticated {
            return Ok(AuthOutcome::Passthrough(AlreadyAuthenticated));
        }

        let principal = self.find_principal(&claims.sub).await?;

        match self.verifier.is_valid(credential, &principal) {
            Ok(true) => {}
            Ok(false) | Err(_) => return Ok(AuthOutcome::Passthrough(NotValidForPrincipal)),
        }

        tracing::debug!(principal_id = principal.id, "Request authenticated");

        Ok(AuthOutcome::Authenticated(AuthenticatedIdentity {
            principal,
            authorities: claims.authorities,
            details,
        }))
    }

    async fn find_principal(&self, subject: &str) -> Result<Principal, AuthError> {
        let lookup = self.lookup.find_principal(subject);

        match tokio::time::timeout(self.security.io_timeout, lookup).await {
            Ok(Ok(Some(principal))) => Ok(principal),
            Ok(Ok(None)) => Err(AuthError::PrincipalNotFound),
            Ok(Err(e)) => {
                tracing::warn!(error = ?e, "Identity lookup failed");
                Err(AuthError::IdentityLookupUnavailable(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.security.io_timeout, "Identity lookup timed out");
                Err(AuthError::IdentityLookupUnavailable("timed out".to_string()))
            }
        }
    }
}
