use thiserror::Error;

/// Startup configuration errors. Any of these aborts the process before it
/// binds a socket.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("JWT secret is not valid base64: {0}")]
    SecretNotBase64(#[from] data_encoding::DecodeError),

    #[error("JWT secret decodes to {bits} bits; at least {min_bits} bits are required")]
    SecretTooShort { bits: usize, min_bits: usize },
}
