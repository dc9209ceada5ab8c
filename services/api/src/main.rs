use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use api::{ApiConfig, AppState, maintenance::SessionMaintenance, routes};
use auth::AuthConfig;
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use common::{DynStore, PgStore};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting API service");

    let api_config = ApiConfig::from_env()?;
    let auth_config = AuthConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }
    run_migrations(&pool).await?;

    let store: DynStore = Arc::new(PgStore::new(pool));
    let app_state = AppState::new(store.clone(), &auth_config, &api_config)?;

    // The scheduler stops when dropped
    let _scheduler = SessionMaintenance::new(
        store,
        api_config.session_retention_days,
        app_state.auth.rate_limiter().clone(),
    )
    .start(&api_config.session_maintenance_schedule)
    .await?;

    let app = routes::create_router(
        app_state,
        Duration::from_secs(api_config.request_timeout_seconds),
    );

    let address = api_config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
