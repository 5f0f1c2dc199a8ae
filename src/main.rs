//! Cache Proxy - A forward HTTP proxy with an LRU response cache
//!
//! Runs the proxy listener and the admin API side by side.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_proxy::{api::create_router, spawn_cleanup_task, AppState, Config, ProxyServer};

/// Main entry point for the caching proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Build cache, rate limiter and upstream client
/// 4. Start background sweep task
/// 5. Bind proxy and admin listeners
/// 6. Serve both until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cache proxy");

    let config = Config::from_env();
    config.validate()?;
    info!(
        proxy_port = config.proxy_port,
        admin_port = config.admin_port,
        max_clients = config.max_clients,
        cache_capacity = config.cache_capacity,
        default_ttl = config.default_ttl,
        rate_limit_max_tokens = config.rate_limit_max_tokens,
        rate_limit_window = config.rate_limit_window,
        cleanup_interval = config.cleanup_interval,
        "configuration loaded"
    );

    let state = AppState::from_config(&config)?;

    let cleanup_handle = (config.cleanup_interval > 0).then(|| {
        spawn_cleanup_task(
            state.dispatcher.cache().clone(),
            state.dispatcher.limiter().clone(),
            config.cleanup_interval,
            config.bucket_idle_after(),
        )
    });
    if cleanup_handle.is_none() {
        info!("periodic sweep disabled, expired entries are removed on read");
    }

    let proxy_addr = SocketAddr::from(([0, 0, 0, 0], config.proxy_port));
    let proxy_listener = TcpListener::bind(proxy_addr)
        .await
        .with_context(|| format!("binding proxy listener on {proxy_addr}"))?;

    let admin_addr = SocketAddr::from(([0, 0, 0, 0], config.admin_port));
    let admin_listener = TcpListener::bind(admin_addr)
        .await
        .with_context(|| format!("binding admin listener on {admin_addr}"))?;
    info!("Admin API listening on http://{}", admin_addr);

    let proxy = ProxyServer::new(
        state.dispatcher.clone(),
        config.max_clients,
        config.client_read_timeout(),
        state.connections.clone(),
    );
    let app = create_router(state);

    // One signal listener fans out to both servers.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let proxy_task = tokio::spawn(proxy.serve(proxy_listener, wait_for(shutdown_rx.clone())));
    let admin_result = axum::serve(admin_listener, app)
        .with_graceful_shutdown(wait_for(shutdown_rx))
        .await
        .context("admin server failed");

    match proxy_task.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(error = %err, "proxy server failed"),
        Err(err) => error!(error = %err, "proxy server task panicked"),
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Sweep task aborted");
    }

    admin_result?;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves once the shutdown flag flips to true.
async fn wait_for(mut rx: watch::Receiver<bool>) {
    // A dropped sender also means shutdown.
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
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
