//! Shared utilities.
//!
//! - [`email`]: token email delivery (SMTP or log-only)

pub mod email;
