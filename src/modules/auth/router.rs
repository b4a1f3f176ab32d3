use crate::modules::auth::controller::{
    authenticate, forgot_password, register, reset_password, verify_account,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/authenticate", post(authenticate))
        .route("/verify-account", get(verify_account))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}
