use std::net::SocketAddr;

use anyhow::Context;
use appointme::appointme_config::AppConfig;
use appointme::appointme_db::init_db_pool;
use appointme::logging::init_tracing;
use appointme::router::init_router;
use appointme::state::init_app_state;
use dotenvy::dotenv;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing()?;

    let config = AppConfig::from_env().context("invalid configuration")?;

    let pool = init_db_pool(&config.database)
        .await
        .context("failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let state = init_app_state(&config, pool);
    let app = init_router(state);

    let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "Server running");
    info!("OpenAPI document available at /api-docs/openapi.json");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
