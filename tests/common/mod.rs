#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use appointme::appointme_config::{
    AppConfig, CorsConfig, DatabaseConfig, EmailConfig, JwtConfig, SecurityConfig,
    SingleUseTokenConfig,
};
use appointme::appointme_core::ManualClock;
use appointme::modules::tokens::store::InMemoryTokenStore;
use appointme::modules::users::repository::{InMemoryUserRepository, UserRepository};
use appointme::router::init_router;
use appointme::state::AppState;
use appointme::utils::email::{RecordingMailer, SentEmailKind};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

/// Base64 of a 46-byte key.
pub const TEST_SECRET: &str = "YXBwb2ludG1lLWlkZW50aXR5LXRlc3Qtc2lnbmluZy1rZXktMDEyMzQ1Njc4OQ==";

pub const STRONG_PASSWORD: &str = "Str0ng!Passw0rd";

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt: JwtConfig::new(TEST_SECRET, Duration::hours(1)).unwrap(),
        tokens: SingleUseTokenConfig::default(),
        security: SecurityConfig {
            bcrypt_cost: 4,
            ..SecurityConfig::default()
        },
        database: DatabaseConfig {
            url: "postgres://localhost/unused".to_string(),
            max_connections: 1,
            acquire_timeout: StdDuration::from_secs(1),
        },
        email: EmailConfig::default(),
        cors: CorsConfig::from_list("http://localhost:4200"),
    }
}

/// The full router over in-memory collaborators and a manual clock.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub users: Arc<InMemoryUserRepository>,
    pub tokens: Arc<InMemoryTokenStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_users(Arc::new(InMemoryUserRepository::new()))
    }

    pub fn with_users(users: Arc<InMemoryUserRepository>) -> Self {
        Self::with_repository(users.clone(), users)
    }

    /// Serves requests through `repository` while `users` stays available
    /// for direct inspection. `repository` normally wraps `users`.
    pub fn with_repository(
        users: Arc<InMemoryUserRepository>,
        repository: Arc<dyn UserRepository>,
    ) -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let tokens = Arc::new(InMemoryTokenStore::new());
        let mailer = Arc::new(RecordingMailer::new());

        let state = AppState::new(
            &test_config(),
            repository,
            tokens.clone(),
            mailer.clone(),
            clock.clone(),
        );

        Self {
            router: init_router(state.clone()),
            state,
            clock,
            users,
            tokens,
            mailer,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn register(&self, email: &str) -> (StatusCode, Value) {
        self.post_json(
            "/api/v1/auth/register",
            json!({
                "firstName": "Alice",
                "lastName": "Smith",
                "email": email,
                "password": STRONG_PASSWORD,
            }),
        )
        .await
    }

    /// Code from the latest mail of `kind` sent to `email`.
    pub fn last_code(&self, email: &str, kind: SentEmailKind) -> String {
        self.mailer
            .last_to(email, kind)
            .expect("no mail sent")
            .code
    }

    pub async fn verify(&self, code: &str) -> (StatusCode, Value) {
        self.get(&format!("/api/v1/auth/verify-account?token={code}"), None)
            .await
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post_json(
            "/api/v1/auth/authenticate",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Registers, verifies and signs in; returns the signed token.
    pub async fn signed_in(&self, email: &str) -> String {
        let (status, _) = self.register(email).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, _) = self
            .verify(&self.last_code(email, SentEmailKind::Verification))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self.authenticate(email, STRONG_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn user_id(&self, email: &str) -> i64 {
        self.users.find_by_email(email).await.unwrap().unwrap().id
    }
}

pub fn generate_unique_email() -> String {
    format!("user-{}@example.com", uuid::Uuid::new_v4().simple())
}
