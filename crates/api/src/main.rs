use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vaani_api::config::ServerConfig;
use vaani_api::router::build_app_router;
use vaani_api::state::AppState;
use vaani_core::layout::ArtifactLayout;
use vaani_pipeline::cleanup;
use vaani_pipeline::{CancelRegistry, CancellationController, PipelineExecutor, Scheduler};
use vaani_store::{snapshot, JobStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vaani_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        workers = config.worker_count,
        queue_depth = config.queue_depth,
        "Loaded server configuration",
    );

    // --- Artifact tree ---
    let layout = ArtifactLayout::new(&config.uploads_dir);
    for dir in layout.all_dirs() {
        tokio::fs::create_dir_all(&dir)
            .await
            .unwrap_or_else(|e| panic!("Failed to create artifact dir {}: {e}", dir.display()));
    }
    tracing::info!(root = %layout.root().display(), "Artifact tree ready");

    // --- Job store ---
    let store = Arc::new(JobStore::with_snapshot(
        layout.root().join(snapshot::SNAPSHOT_FILE),
    ));

    // Close out jobs stranded by the previous run before accepting new ones.
    cleanup::reconcile(&store, &layout).await;

    // --- Pipeline ---
    let registry = Arc::new(CancelRegistry::new());
    let executor = Arc::new(PipelineExecutor::new(
        Arc::clone(&store),
        vaani_engines::default_engines(),
        Arc::clone(&registry),
        layout.clone(),
        config.stage_timeout_multiplier,
    ));
    let scheduler = Scheduler::start(config.worker_count, config.queue_depth, executor);
    let controller = Arc::new(CancellationController::new(
        Arc::clone(&store),
        Arc::clone(&registry),
    ));

    // --- Retention loop ---
    let retention_cancel = tokio_util::sync::CancellationToken::new();
    let retention_handle = tokio::spawn(cleanup::run_retention_loop(
        Arc::clone(&store),
        layout.clone(),
        chrono::Duration::hours(config.retention_hours),
        retention_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        store: Arc::clone(&store),
        scheduler: Arc::clone(&scheduler),
        controller,
        layout,
        config: Arc::new(config.clone()),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

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

    // Stop dispatching queued jobs; in-flight jobs get a bounded drain.
    scheduler.shutdown();
    let drained = tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        async {
            while scheduler.active_workers() > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        },
    )
    .await;
    if drained.is_err() {
        tracing::warn!("Drain timeout exceeded, cancelling in-flight jobs");
        registry.cancel_all();
    }
    tracing::info!("Worker pool stopped");

    // Stop the retention loop.
    retention_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Retention job stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
