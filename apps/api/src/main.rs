use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::router::AppointmentCellState;
use appointment_cell::services::{notifier_from_config, NotificationDispatcher};
use shared_config::AppConfig;
use slot_cell::router::SlotCellState;
use slot_cell::{Clock, SlotStore, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clinic Scheduler API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    // Shared stores and collaborators
    let store = Arc::new(SlotStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifications = NotificationDispatcher::spawn(
        notifier_from_config(&config),
        config.notification_queue_capacity,
    );

    let slot_state = Arc::new(SlotCellState::new(
        Arc::clone(&config),
        Arc::clone(&store),
        Arc::clone(&clock),
    ));
    let appointment_state = Arc::new(AppointmentCellState::new(
        Arc::clone(&config),
        store,
        clock,
        notifications,
    ));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(slot_state, appointment_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let listener = TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server_addr))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
