use anyhow::anyhow;
use appointme_core::{AppError, hash_password_with_cost, verify_password};
use appointme_db::StoreError;
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

use super::model::{
    AuthenticationRequest, AuthenticationResponse, FULL_NAME_CLAIM, MessageResponse,
    RegistrationRequest, ResetPasswordRequest,
};
use crate::modules::tokens::model::{
    ACTIVATION_EXPIRED_MESSAGE, ConsumeOutcome, RESET_EXPIRED_MESSAGE, SingleUseToken,
    SingleUseTokenError, TokenPurpose,
};
use crate::modules::users::model::{NewUser, User};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub struct AuthService;

impl AuthService {
    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn register(
        state: &AppState,
        dto: RegistrationRequest,
    ) -> Result<MessageResponse, AppError> {
        let password_hash = hash_password_with_cost(&dto.password, state.security.bcrypt_cost)?;

        let user = state
            .users
            .create(NewUser {
                first_name: dto.first_name.trim().to_string(),
                last_name: dto.last_name.trim().to_string(),
                email: dto.email.trim().to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => {
                    AppError::conflict(anyhow!("User with this email already exists"))
                }
                other => other.into(),
            })?;

        let issued = state
            .tokens
            .issue(user.id, TokenPurpose::EmailVerification)
            .await?;
        Self::deliver(state, &user, TokenPurpose::EmailVerification, &issued.value).await;

        info!(user_id = user.id, "User registered");

        Ok(MessageResponse::new(
            "Registration successful. Check your email to activate your account",
        ))
    }

    #[instrument(skip(state, dto), fields(email = %dto.email))]
    pub async fn authenticate(
        state: &AppState,
        dto: AuthenticationRequest,
    ) -> Result<AuthenticationResponse, AppError> {
        let user = state
            .users
            .find_by_email(dto.email.trim())
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

        if !verify_password(&dto.password, &user.password)? {
            warn!(user_id = user.id, "Authentication failed: wrong password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        if !user.email_verified {
            return Err(AppError::unauthorized("Account is not verified"));
        }

        if user.locked {
            return Err(AppError::unauthorized("Account is locked"));
        }

        let mut extra = Map::new();
        extra.insert(FULL_NAME_CLAIM.to_string(), Value::String(user.full_name()));

        let token = state.codec.issue(&user.email, extra, &user.roles)?;

        info!(user_id = user.id, "User authenticated");

        Ok(AuthenticationResponse { token })
    }

    #[instrument(skip(state, token))]
    pub async fn verify_account(state: &AppState, token: &str) -> Result<MessageResponse, AppError> {
        let consumed = Self::consume(
            state,
            token,
            TokenPurpose::EmailVerification,
            ACTIVATION_EXPIRED_MESSAGE,
        )
        .await?;

        let written = state.users.mark_email_verified(consumed.user_id).await;
        Self::settle(state, &consumed, written).await?;

        info!(user_id = consumed.user_id, "Account activated");

        Ok(MessageResponse::new("Account activated successfully"))
    }

    /// Mails a reset code when the account exists. The response never
    /// reveals whether it does.
    #[instrument(skip(state, email))]
    pub async fn forgot_password(state: &AppState, email: &str) -> Result<MessageResponse, AppError> {
        if let Some(user) = state.users.find_by_email(email.trim()).await? {
            let issued = state
                .tokens
                .issue(user.id, TokenPurpose::PasswordReset)
                .await?;
            Self::deliver(state, &user, TokenPurpose::PasswordReset, &issued.value).await;

            info!(user_id = user.id, "Password reset requested");
        }

        Ok(MessageResponse::new(
            "If an account with that email exists, a password reset link has been sent",
        ))
    }

    #[instrument(skip(state, dto))]
    pub async fn reset_password(
        state: &AppState,
        dto: ResetPasswordRequest,
    ) -> Result<MessageResponse, AppError> {
        let password_hash =
            hash_password_with_cost(&dto.new_password, state.security.bcrypt_cost)?;

        let consumed = Self::consume(
            state,
            &dto.token,
            TokenPurpose::PasswordReset,
            RESET_EXPIRED_MESSAGE,
        )
        .await?;

        let written = state
            .users
            .update_password(consumed.user_id, &password_hash)
            .await;
        Self::settle(state, &consumed, written).await?;

        info!(user_id = consumed.user_id, "Password reset");

        Ok(MessageResponse::new("Password has been reset successfully"))
    }

    /// Consumes `value`, mailing the replacement when it turns out expired.
    async fn consume(
        state: &AppState,
        value: &str,
        purpose: TokenPurpose,
        expired_message: &'static str,
    ) -> Result<SingleUseToken, AppError> {
        match state.tokens.consume(value, purpose).await? {
            ConsumeOutcome::Consumed(token) => Ok(token),
            ConsumeOutcome::Expired { token, replacement } => {
                if let Some(replacement) = replacement {
                    match state.users.find_by_id(token.user_id).await? {
                        Some(user) => {
                            Self::deliver(state, &user, purpose, &replacement.value).await
                        }
                        None => warn!(user_id = token.user_id, "Token owner no longer exists"),
                    }
                }
                Err(SingleUseTokenError::Expired(expired_message).into())
            }
            ConsumeOutcome::AlreadyConsumed(_) => Err(SingleUseTokenError::AlreadyConsumed.into()),
            ConsumeOutcome::Unknown => Err(SingleUseTokenError::Unknown.into()),
        }
    }

    /// Releases `token` when the account write it authorised failed, so the
    /// same value can be presented again.
    async fn settle(
        state: &AppState,
        token: &SingleUseToken,
        written: Result<(), StoreError>,
    ) -> Result<(), AppError> {
        let Err(e) = written else {
            return Ok(());
        };

        if let Err(release) = state.tokens.release(token).await {
            error!(token_id = token.id, error = %release, "Failed to release single-use token");
        }

        Err(e.into())
    }

    /// Delivery failures are logged only.
    async fn deliver(state: &AppState, user: &User, purpose: TokenPurpose, code: &str) {
        let name = user.full_name();
        let result = match purpose {
            TokenPurpose::EmailVerification => {
                let link = format!("{}?token={code}", state.email.activation_url());
                state
                    .mailer
                    .send_verification(&user.email, &name, &link, code)
                    .await
            }
            TokenPurpose::PasswordReset => {
                let link = format!("{}?token={code}", state.email.reset_password_url());
                state
                    .mailer
                    .send_password_reset(&user.email, &name, &link, code)
                    .await
            }
        };

        if let Err(e) = result {
            error!(user_id = user.id, %purpose, error = %e, "Failed to send token email");
        }
    }
}
