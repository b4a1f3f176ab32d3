use std::net::SocketAddr;

use appointme_auth::{AuthOutcome, AuthenticatedIdentity, InboundRequest, RequestDetails};
use appointme_core::AppError;
use axum::extract::{ConnectInfo, FromRequestParts, OriginalUri, Request, State};
use axum::http::{HeaderMap, header, request::Parts};
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;

/// Header a client may use to correlate requests of one session.
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Runs the request authenticator and, on success, stores the
/// [`AuthenticatedIdentity`] in the request extensions.
///
/// Requests without a usable credential continue unauthenticated; handlers
/// that need an identity use [`CurrentUser`].
pub async fn authenticate_request(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let authorization = header_value(req.headers(), header::AUTHORIZATION.as_str());
    let details = RequestDetails {
        remote_addr: req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
        session_id: header_value(req.headers(), SESSION_ID_HEADER),
    };
    let already_authenticated = req.extensions().get::<AuthenticatedIdentity>().is_some();

    let outcome = state
        .authenticator
        .authenticate(
            InboundRequest {
                path: &path,
                authorization: authorization.as_deref(),
                already_authenticated,
            },
            details,
        )
        .await?;

    if let AuthOutcome::Authenticated(identity) = outcome {
        req.extensions_mut().insert(identity);
    }

    Ok(next.run(req).await)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Extractor for the identity established by [`authenticate_request`].
/// Rejects with 401 when the request is unauthenticated.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedIdentity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}
