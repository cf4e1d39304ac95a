//! # TaskReview API Server
//!
//! REST API for assigning tasks and skill-module reviews to employees and
//! tracking their per-module scores.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) STORE_BACKEND=memory cargo run -p taskreview-api
//! ```

use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;
use taskreview_api::{
    app::{build_router, AppState},
    config::{Config, StoreBackend},
};
use taskreview_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::{memory::MemoryStore, postgres::PgStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskreview_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskReview API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let (store, pool): (Arc<dyn Store>, Option<PgPool>) = match (config.store, &config.database) {
        (StoreBackend::Postgres, Some(database)) => {
            let pool = create_pool(DatabaseConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                ..Default::default()
            })
            .await
            .context("Failed to connect to database")?;

            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
            (store, Some(pool))
        }
        (StoreBackend::Postgres, None) => anyhow::bail!("DATABASE_URL is required for the postgres store"),
        (StoreBackend::Memory, _) => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            (store, None)
        }
    };

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
