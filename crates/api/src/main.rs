use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dreamreel_api::config::{ServerConfig, StoreKind};
use dreamreel_api::router::build_app_router;
use dreamreel_api::state::AppState;
use dreamreel_db::{EntryStore, MemoryEntryStore, PgEntryStore};
use dreamreel_events::{EventBus, EventLog};
use dreamreel_pipeline::{Pipeline, PipelineConfig};
use dreamreel_providers::ProviderConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let pipeline_config = PipelineConfig::from_env();
    let provider_config = ProviderConfig::from_env();
    tracing::info!(mode = ?provider_config.mode, "Loaded provider configuration");

    // --- Entry store ---
    let store = open_store(config.entry_store).await;

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let event_log_cancel = CancellationToken::new();
    let event_log_handle = tokio::spawn(EventLog::run(
        event_bus.subscribe(),
        event_log_cancel.clone(),
    ));
    tracing::info!("Event log started");

    // --- Pipeline ---
    let pipeline = Arc::new(Pipeline::new(
        store,
        provider_config.build(),
        Arc::clone(&event_bus),
        pipeline_config,
    ));

    // --- Router ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let app = build_app_router(AppState::new(pipeline, config.clone()), &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    event_log_cancel.cancel();
    match tokio::time::timeout(shutdown_timeout, event_log_handle).await {
        Ok(Ok(logged)) => tracing::info!(logged, "Event log stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Event log task failed"),
        Err(_) => tracing::warn!("Event log did not stop within the shutdown timeout"),
    }

    tracing::info!("Graceful shutdown complete");
}

/// `LOG_FORMAT=json` switches to JSON lines; the filter comes from `RUST_LOG`.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "dreamreel_api=debug,dreamreel_pipeline=debug,tower_http=debug".into()
    });
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn open_store(kind: StoreKind) -> Arc<dyn EntryStore> {
    match kind {
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory entry store, entries are lost on restart");
            Arc::new(MemoryEntryStore::new())
        }
        StoreKind::Postgres => {
            let database_url = std::env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set when ENTRY_STORE=postgres");

            let pool = dreamreel_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            dreamreel_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            dreamreel_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgEntryStore::new(pool))
        }
    }
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
