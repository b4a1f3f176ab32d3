use appointme_core::AppError;
use axum::Json;
use axum::extract::State;
use tracing::instrument;

use super::model::UserProfile;
use crate::middleware::auth::CurrentUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user profile", body = UserProfile),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Account no longer exists", body = ErrorResponse)
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, current_user), fields(user_id = current_user.0.principal.id))]
pub async fn get_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<UserProfile>, AppError> {
    let identity = current_user.0;
    let user = state
        .users
        .find_by_id(identity.principal.id)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))?;

    Ok(Json(UserProfile::new(user, identity.authorities)))
}
