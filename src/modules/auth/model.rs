use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Claim carrying the account's display name in issued signed tokens.
pub const FULL_NAME_CLAIM: &str = "fullName";

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[validate(
        length(min = 1, max = 50, message = "First name must be between 1 and 50 characters"),
        custom(function = "not_blank", message = "First name is required")
    )]
    pub first_name: String,
    #[validate(
        length(min = 1, max = 50, message = "Last name must be between 1 and 50 characters"),
        custom(function = "not_blank", message = "Last name is required")
    )]
    pub last_name: String,
    #[validate(
        email(message = "Email is not valid"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
    #[validate(
        length(min = 8, max = 72, message = "Password must be between 8 and 72 characters"),
        custom(function = "password_strength")
    )]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AuthenticationRequest {
    #[validate(email(message = "Email is not valid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthenticationResponse {
    pub token: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyAccountQuery {
    /// Code from the verification email.
    pub token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Email is not valid"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(
        length(min = 8, max = 72, message = "Password must be between 8 and 72 characters"),
        custom(function = "password_strength")
    )]
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// At least one lowercase letter, uppercase letter, digit and special
/// character (anything but letters, digits, `_` and whitespace).
fn password_strength(password: &str) -> Result<(), ValidationError> {
    let has_lower = password.chars().any(char::is_lowercase);
    let has_upper = password.chars().any(char::is_uppercase);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| !c.is_alphanumeric() && c != '_' && !c.is_whitespace());

    if has_lower && has_upper && has_digit && has_special {
        return Ok(());
    }

    Err(ValidationError::new("password_strength").with_message(Cow::Borrowed(
        "Password must contain at least one uppercase letter, one lowercase letter, one digit and one special character",
    )))
}
