//! Tiered Cache - HTTP front end for the tiered cache service

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiered_cache::api::create_router;
use tiered_cache::{spawn_cleanup_task, spawn_recovery_task, AppState, Config};

/// Main entry point for the tiered cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and connect the primary store in the background
/// 4. Start background expiry cleanup and, if enabled, primary recovery
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. On SIGINT/SIGTERM stop the tasks and disconnect the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiered_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tiered Cache Server");

    let config = Config::from_env();
    info!(
        primary_configured = config.redis_url.is_some(),
        max_memory_entries = config.max_memory_entries,
        default_ttl = config.default_ttl,
        port = config.server_port,
        cleanup_interval = config.cleanup_interval,
        recovery_interval = config.redis_recovery_interval,
        "configuration loaded"
    );

    let state = AppState::from_config(&config);
    let cache = state.cache.clone();

    // Requests are served from the fallback store until this finishes
    let _init = cache.spawn_init();

    let mut tasks = vec![spawn_cleanup_task(cache.clone(), config.cleanup_interval)];
    if let Some(recovery) = spawn_recovery_task(cache.clone(), config.redis_recovery_interval) {
        tasks.push(recovery);
    }
    info!(count = tasks.len(), "background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    stop_tasks(tasks);
    cache.disconnect().await;

    info!("Server shutdown complete");
    Ok(())
}

fn stop_tasks(tasks: Vec<JoinHandle<()>>) {
    for task in tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
