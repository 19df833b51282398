//! Server lifecycle
//!
//! Starts the HTTP server and, on shutdown, stops the broker first so that
//! open event streams end and graceful shutdown does not wait on them.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use devicehub_api::{create_router, AppState};
use devicehub_broker::Broker;
use devicehub_core::{bootstrap::Services, Config};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DeviceHubServer {
    config: Config,
    services: Services,
    broker: Broker,
    broker_handle: JoinHandle<()>,
}

impl DeviceHubServer {
    pub const fn new(
        config: Config,
        services: Services,
        broker: Broker,
        broker_handle: JoinHandle<()>,
    ) -> Self {
        Self {
            config,
            services,
            broker,
            broker_handle,
        }
    }

    /// Start the HTTP server and wait for shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = AppState::new(&self.config, self.services, self.broker.clone())?;
        let mut http_handle = start_http_server(self.config.http_address(), state, shutdown_rx);

        info!("All servers started successfully");

        let http_finished = tokio::select! {
            _ = &mut http_handle => {
                error!("HTTP server stopped unexpectedly");
                true
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
                false
            }
        };

        // Ending the broker closes every stream so in-flight SSE responses complete
        self.broker.shutdown();
        let _ = shutdown_tx.send(true);

        if !http_finished && tokio::time::timeout(SHUTDOWN_TIMEOUT, http_handle).await.is_err() {
            warn!("HTTP server did not stop within {:?}", SHUTDOWN_TIMEOUT);
        }
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.broker_handle).await.is_err() {
            warn!("Notification broker did not stop within {:?}", SHUTDOWN_TIMEOUT);
        }

        info!("DeviceHub server shut down complete");
        Ok(())
    }
}

/// Start HTTP server with graceful shutdown support
fn start_http_server(
    http_address: String,
    state: AppState,
    shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let http_router = create_router(state);

    tokio::spawn(async move {
        let http_addr: std::net::SocketAddr = match http_address.parse() {
            Ok(addr) => addr,
            Err(e) => {
                error!("Invalid HTTP address '{}': {}", http_address, e);
                return;
            }
        };

        let listener = match tokio::net::TcpListener::bind(http_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind HTTP address {}: {}", http_addr, e);
                return;
            }
        };

        info!("HTTP server listening on {}", http_addr);

        let mut rx = shutdown_rx;
        let graceful = async move {
            let _ = rx.changed().await;
        };

        if let Err(e) = axum::serve(listener, http_router)
            .with_graceful_shutdown(graceful)
            .await
        {
            error!("HTTP server error: {}", e);
        }

        info!("HTTP server shut down gracefully");
    })
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
