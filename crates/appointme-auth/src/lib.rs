//! # AppointMe Auth
//!
//! Signed tokens and per-request authentication for the AppointMe identity
//! service.
//!
//! This crate provides:
//!
//! - [`claims`]: the JWT claim set
//! - [`jwt`]: [`TokenCodec`], which issues and verifies signed tokens
//! - [`principal`]: [`Principal`] and the [`IdentityLookup`] collaborator
//! - [`authenticator`]: [`RequestAuthenticator`], the bearer-token state machine
//!   run once per request
//! - [`error`]: [`TokenError`] and [`AuthError`]
//!
//! The crate has no HTTP or database dependencies. The application wires it
//! into an axum middleware and supplies a database-backed lookup.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use appointme_auth::{InboundRequest, RequestAuthenticator, RequestDetails, TokenCodec};
//!
//! let codec = Arc::new(TokenCodec::new(&config.jwt, clock));
//! let authenticator = RequestAuthenticator::new(config.security.clone(), codec, lookup);
//!
//! let outcome = authenticator
//!     .authenticate(
//!         InboundRequest {
//!             path: "/api/v1/users/me",
//!             authorization: Some("Bearer eyJ..."),
//!             already_authenticated: false,
//!         },
//!         RequestDetails::default(),
//!     )
//!     .await?;
//! ```

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod jwt;
pub mod principal;

// Re-export commonly used types at crate root
pub use authenticator::{
    AuthOutcome, AuthenticatedIdentity, BEARER_PREFIX, InboundRequest, PassthroughReason,
    RequestAuthenticator, RequestDetails,
};
pub use claims::{AUTHORITIES_CLAIM, Claims};
pub use error::{AuthError, TokenError};
pub use jwt::{TokenCodec, TokenVerifier};
pub use principal::{IdentityLookup, Principal};
