use paperfloor::config::Config;
use paperfloor::websocket::{self, CloseReason};
use paperfloor::{api, AppState};

use axum::{routing::get, Router};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing; LOG_LEVEL overrides the default directive
    let default_filter = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "paperfloor=debug,tower_http=debug".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration (fails fast on a missing or weak JWT secret)
    let config = Config::from_env()?;
    let host = config.host.clone();
    let candidate_ports = config.bind_ports.clone();

    // Wire components and start the reference market
    let state = AppState::initialize(config);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .route("/ws", get(websocket::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Try candidate ports in order; give up with exit code 2
    let mut listener = None;
    for port in &candidate_ports {
        let addr = format!("{}:{}", host, port);
        match TcpListener::bind(&addr).await {
            Ok(bound) => {
                info!("paperfloor listening on {}", addr);
                listener = Some(bound);
                break;
            }
            Err(e) => warn!("could not bind {}: {}", addr, e),
        }
    }
    let Some(listener) = listener else {
        error!("all candidate ports failed to bind: {:?}", candidate_ports);
        std::process::exit(2);
    };

    // Serve until the shutdown signal, then drain with a 10 second cap
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // Stop accepting new work, close push connections with a normal close
    state.registry.stop_all();
    state.hub.close_all(CloseReason::Shutdown);
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(Duration::from_secs(10), server).await {
        Ok(result) => result??,
        Err(_) => warn!("in-flight work did not drain in time; exiting"),
    }

    info!("shutdown complete");
    Ok(())
}
