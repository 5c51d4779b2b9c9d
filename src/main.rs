use roomcast::{
    routes::{router, AppState},
    BusEventSource, ChatConfig, ChatCoordinator, InMemoryQueue,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomcast=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting roomcast chat fan-out server");

    let config = match ChatConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    let addr = std::env::var("ROOMCAST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    // In-process collaborators; swap for a broker and cache client in production
    let queue = Arc::new(InMemoryQueue::new());
    let bus = BusEventSource::default();
    let shutdown = CancellationToken::new();

    let coordinator =
        match ChatCoordinator::start(queue, Arc::new(bus.clone()), config, shutdown.clone()) {
            Ok(coordinator) => coordinator,
            Err(e) => {
                error!(error = %e, "Invalid configuration");
                std::process::exit(1);
            }
        };
    let app_state = AppState::new(Arc::new(coordinator), bus);

    let app = router(app_state).layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    info!("Server running on http://{}", addr);

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        signal_token.cancel();
    });

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled_owned().await });
    if let Err(e) = server.await {
        error!(error = %e, "Server error");
    }
}
