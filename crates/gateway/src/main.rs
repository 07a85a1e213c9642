//! Read-only gateway for curated papers (§2.2).
//!
//! Deliberately thin: three routes, no auth, no rate limiting, no
//! personalization — everything the curation pipeline's read side needs
//! and nothing the Non-goals exclude. Observability (tracing, metrics)
//! is carried in full since it's ambient stack, not a feature.

mod error;
mod handlers;

use axum::routing::get;
use axum::Router;
use curator_common::config::PipelineConfig;
use curator_common::db::{DbPool, Repository};
use curator_common::VERSION;
use std::net::SocketAddr;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = PipelineConfig::load().map_err(|e| {
        tracing::error!(error = %e, "failed to load configuration");
        e
    })?;

    curator_common::logging::init(&config.observability);
    curator_common::metrics::register_metrics();

    info!(version = VERSION, "starting read API gateway");

    let pool = DbPool::new(&config.database).await?;
    let state = AppState {
        repo: Repository::new(pool),
    };

    let app = create_router(state);

    let port: u16 = std::env::var("GATEWAY_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway shutdown complete");
    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/papers", get(handlers::papers::list_papers))
        .route("/papers/{arxiv_id}", get(handlers::papers::get_paper))
        .route("/healthz", get(handlers::health::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, starting shutdown"),
        _ = terminate => info!("received sigterm, starting shutdown"),
    }
}
