//! Request authentication.
//!
//! - [`auth`]: the authentication middleware and the [`CurrentUser`](auth::CurrentUser)
//!   extractor
//!
//! # Authentication Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. `authenticate_request` runs the request authenticator once per request
//! 3. A valid token for an existing account stores an `AuthenticatedIdentity`
//!    in the request extensions; anything else continues unauthenticated
//! 4. Protected handlers take `CurrentUser`, which rejects with 401 when no
//!    identity was established
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::CurrentUser;
//!
//! async fn get_me(current_user: CurrentUser) -> impl IntoResponse {
//!     let principal = &current_user.0.principal;
//!     // ...
//! }
//! ```

pub mod auth;
