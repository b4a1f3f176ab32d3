use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::controller::ErrorResponse;
use crate::modules::auth::model::{
    AuthenticationRequest, AuthenticationResponse, ForgotPasswordRequest, MessageResponse,
    RegistrationRequest, ResetPasswordRequest,
};
use crate::modules::users::model::UserProfile;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register,
        crate::modules::auth::controller::authenticate,
        crate::modules::auth::controller::verify_account,
        crate::modules::auth::controller::forgot_password,
        crate::modules::auth::controller::reset_password,
        crate::modules::users::controller::get_me,
    ),
    components(
        schemas(
            RegistrationRequest,
            AuthenticationRequest,
            AuthenticationResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            MessageResponse,
            UserProfile,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, sign-in and account recovery"),
        (name = "Users", description = "The authenticated account")
    ),
    info(
        title = "AppointMe Identity API",
        version = "0.1.0",
        description = "Account registration, email verification and signed-token authentication for AppointMe.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

/// Serves the OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
