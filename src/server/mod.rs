//! Proxy Server Module
//!
//! Accept loop for the proxy port. A semaphore sized to the worker pool is
//! acquired before each `accept`, so at most `max_clients` connections are
//! served at once and further clients wait in the listen backlog.

mod connection;

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::dispatch::RequestDispatcher;

pub use connection::{handle_connection, MAX_LINE_LEN};

// == Connection Gauge ==
/// Live and cumulative connection counts, shared with the admin API.
#[derive(Debug, Default)]
pub struct ConnectionGauge {
    active: AtomicUsize,
    accepted: AtomicU64,
}

impl ConnectionGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a connection as active until the guard is dropped.
    pub fn enter(self: &Arc<Self>) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::Relaxed);
        self.accepted.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard(Arc::clone(self))
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct ConnectionGuard(Arc<ConnectionGauge>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::Relaxed);
    }
}

// == Proxy Server ==
/// Bounded worker pool mapping accepted connections to dispatch calls.
pub struct ProxyServer {
    dispatcher: RequestDispatcher,
    permits: Arc<Semaphore>,
    connections: Arc<ConnectionGauge>,
    read_timeout: Duration,
}

impl ProxyServer {
    pub fn new(
        dispatcher: RequestDispatcher,
        max_clients: usize,
        read_timeout: Duration,
        connections: Arc<ConnectionGauge>,
    ) -> Self {
        Self {
            dispatcher,
            permits: Arc::new(Semaphore::new(max_clients.max(1))),
            connections,
            read_timeout,
        }
    }

    /// Permits not currently held by a connection.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    // == Serve ==
    /// Runs the accept loop until `shutdown` resolves.
    ///
    /// In-flight connections are left to finish on their own tasks.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr().context("reading proxy listener address")?;
        info!(address = %local_addr, "proxy listener started");
        tokio::pin!(shutdown);

        loop {
            let permit = tokio::select! {
                permit = Arc::clone(&self.permits).acquire_owned() => {
                    permit.context("worker pool semaphore closed")?
                }
                _ = &mut shutdown => break,
            };

            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        error!(error = %err, "failed to accept incoming connection");
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };
            debug!(peer = %peer, "accepted connection");

            let guard = self.connections.enter();
            let dispatcher = self.dispatcher.clone();
            let read_timeout = self.read_timeout;
            tokio::spawn(async move {
                let _permit = permit;
                let _guard = guard;
                if let Err(err) = handle_connection(stream, peer, &dispatcher, read_timeout).await
                {
                    debug!(peer = %peer, error = %err, "connection closed with error");
                }
            });
        }

        info!("proxy listener stopped");
        Ok(())
    }
}
