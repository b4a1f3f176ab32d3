use appointme_core::AppError;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use tracing::instrument;
use utoipa::ToSchema;

use super::model::{
    AuthenticationRequest, AuthenticationResponse, ForgotPasswordRequest, MessageResponse,
    RegistrationRequest, ResetPasswordRequest, VerifyAccountQuery,
};
use super::service::AuthService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[derive(ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegistrationRequest,
    responses(
        (status = 202, description = "Account created; verification email sent", body = MessageResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<RegistrationRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let response = AuthService::register(&state, dto).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Exchange credentials for a signed token
#[utoipa::path(
    post,
    path = "/api/v1/auth/authenticate",
    request_body = AuthenticationRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthenticationResponse),
        (status = 401, description = "Bad credentials, unverified or locked account", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn authenticate(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<AuthenticationRequest>,
) -> Result<Json<AuthenticationResponse>, AppError> {
    let response = AuthService::authenticate(&state, dto).await?;
    Ok(Json(response))
}

/// Activate an account with the emailed code
#[utoipa::path(
    get,
    path = "/api/v1/auth/verify-account",
    params(VerifyAccountQuery),
    responses(
        (status = 200, description = "Account activated", body = MessageResponse),
        (status = 400, description = "Token expired; a new one was emailed", body = ErrorResponse),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 409, description = "Token already used", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, query))]
pub async fn verify_account(
    State(state): State<AppState>,
    Query(query): Query<VerifyAccountQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let response = AuthService::verify_account(&state, &query.token).await?;
    Ok(Json(response))
}

/// Request a password reset email
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent if the account exists", body = MessageResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let response = AuthService::forgot_password(&state, &dto.email).await?;
    Ok(Json(response))
}

/// Set a new password with the emailed code
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Token expired; a new one was emailed", body = ErrorResponse),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 409, description = "Token already used", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let response = AuthService::reset_password(&state, dto).await?;
    Ok(Json(response))
}
