use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use identity_service::config::{BackendKind, IdentityConfig};
use identity_service::repo::Repositories;
use identity_service::services::IdentityService;
use identity_service::{bootstrap, build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = IdentityConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let repos = match config.backend {
        BackendKind::Memory => {
            tracing::info!("using in-memory backend");
            Repositories::memory()
        }
        BackendKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?;
            let pool = PgPoolOptions::new().max_connections(16).connect(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("using postgres backend");
            Repositories::postgres(pool)
        }
    };

    bootstrap(&repos, &config).await?;

    let identity = Arc::new(
        IdentityService::new(
            repos,
            &config.admin_role,
            &config.service_admin_role,
            config.token_ttl_seconds,
        )
        .await?,
    );

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let app = build_router(AppState {
        config: config.clone(),
        identity,
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "identity service listening");
    axum::serve(listener, app).await?;
    Ok(())
}
