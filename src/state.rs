use std::sync::Arc;

use appointme_auth::{RequestAuthenticator, TokenCodec};
use appointme_config::{AppConfig, CorsConfig, EmailConfig, SecurityConfig};
use appointme_core::{Clock, SystemClock};
use appointme_db::PgPool;

use crate::modules::tokens::service::SingleUseTokenService;
use crate::modules::tokens::store::{PgTokenStore, TokenStore};
use crate::modules::users::repository::{PgUserRepository, UserIdentityLookup, UserRepository};
use crate::utils::email::{Mailer, mailer_from_config};

#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub authenticator: Arc<RequestAuthenticator>,
    pub tokens: Arc<SingleUseTokenService>,
    pub users: Arc<dyn UserRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub email: EmailConfig,
    pub security: SecurityConfig,
    pub cors: CorsConfig,
}

impl AppState {
    /// Wires the services over the given persistence, mail and time
    /// collaborators.
    pub fn new(
        config: &AppConfig,
        users: Arc<dyn UserRepository>,
        token_store: Arc<dyn TokenStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(&config.jwt, clock.clone()));
        let lookup = Arc::new(UserIdentityLookup::new(users.clone()));
        let authenticator = Arc::new(RequestAuthenticator::new(
            config.security.clone(),
            codec.clone(),
            lookup,
        ));
        let tokens = Arc::new(SingleUseTokenService::new(
            token_store,
            clock,
            config.tokens.clone(),
        ));

        Self {
            codec,
            authenticator,
            tokens,
            users,
            mailer,
            email: config.email.clone(),
            security: config.security.clone(),
            cors: config.cors.clone(),
        }
    }
}

pub fn init_app_state(config: &AppConfig, db: PgPool) -> AppState {
    let timeout = config.security.io_timeout;

    AppState::new(
        config,
        Arc::new(PgUserRepository::new(db.clone(), timeout)),
        Arc::new(PgTokenStore::new(db, timeout)),
        mailer_from_config(&config.email),
        Arc::new(SystemClock),
    )
}
