//! Single-use tokens for out-of-band account actions (email verification,
//! password reset).
//!
//! - [`model`]: records, outcomes and errors
//! - [`store`]: the [`TokenStore`](store::TokenStore) persistence boundary
//! - [`service`]: issue / consume / reissue-on-expiry

pub mod model;
pub mod service;
pub mod store;
