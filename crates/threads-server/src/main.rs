mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use threads_api::routes;
use threads_api::service::EngagementService;
use threads_api::state::AppStateInner;
use threads_db::Store;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "threads=debug,threads_api=debug,threads_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // The store opens lazily; connecting here only surfaces problems early.
    // A failure is retried by the first request that needs the database.
    let store = Arc::new(Store::new(config.store.clone()));
    if let Err(e) = store.acquire() {
        warn!("Store not available at startup: {}", e);
    }

    let service = EngagementService::new(store, config.toggle_mode.build(), config.delete_policy);
    let state = AppStateInner::new(service, config.jwt_secret);

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Threads server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
