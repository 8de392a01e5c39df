//! Main application orchestration.
//!
//! Owns the status store and the connection manager, prints the status
//! line on every change and tears everything down on shutdown.

use crate::config::AppConfig;
use crate::error::AppResult;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zbstat_feed::{StatusSnapshot, StatusStore};
use zbstat_telemetry::Metrics;
use zbstat_ws::ConnectionManager;

/// Main application.
pub struct Application {
    store: Arc<StatusStore>,
    manager: ConnectionManager,
}

impl Application {
    /// Create a new application from a validated configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let store = Arc::new(StatusStore::new(config.tracked.clone()));
        let manager = ConnectionManager::new(config.connection_config(), store.clone());

        info!(
            url = manager.url(),
            tracked = ?store.keys(),
            "Application configured"
        );

        Ok(Self { store, manager })
    }

    /// Shared handle to the status store.
    pub fn store(&self) -> Arc<StatusStore> {
        self.store.clone()
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(?e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` resolves.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> AppResult<()> {
        let mut updates = self.store.subscribe();
        self.manager.start()?;

        let initial = updates.borrow_and_update().clone();
        render(&initial);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    render(&snapshot);
                }

                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.manager.shutdown();
        self.manager.wait().await;

        let stats = self.manager.stats();
        info!(
            reconnect_count = stats.reconnect_count,
            last_open = ?stats.last_open,
            "Connection manager stopped"
        );
        match Metrics::render() {
            Ok(text) => debug!(metrics = %text, "Final metrics"),
            Err(e) => warn!(error = %e, "Failed to render metrics"),
        }

        Ok(())
    }
}

/// Print the status line, or note that the panel is hidden.
fn render(snapshot: &StatusSnapshot) {
    match snapshot.status_line() {
        Some(line) => println!("{line}"),
        None => debug!("Disconnected, status panel hidden"),
    }
}
