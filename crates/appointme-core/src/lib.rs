//! # AppointMe Core
//!
//! Core types, errors, and utilities for the AppointMe identity service.
//!
//! This crate provides foundational types used throughout the workspace:
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`password`]: Password hashing and verification (bcrypt)
//! - [`clock`]: Injectable time source used by every expiry check
//!
//! # Example
//!
//! ```ignore
//! use appointme_core::{AppError, Clock, SystemClock};
//!
//! let clock = SystemClock;
//! let now = clock.now();
//!
//! let error = AppError::not_found(anyhow::anyhow!("Token not found"));
//! ```

pub mod clock;
pub mod errors;
pub mod password;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::AppError;
pub use password::{hash_password_with_cost, verify_password};
