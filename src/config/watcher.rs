//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::TelemetryConfig;
use crate::telemetry::Telemetry;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<TelemetryConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<TelemetryConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for updates to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload config: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Apply reloaded configurations until the sender side goes away.
///
/// Only the redaction policy is hot-swappable; other sections need a
/// restart and are reported when they change.
pub async fn apply_updates(
    telemetry: Telemetry,
    current: TelemetryConfig,
    mut updates: mpsc::UnboundedReceiver<TelemetryConfig>,
) {
    let mut current = current;
    while let Some(new_config) = updates.recv().await {
        telemetry.redaction().replace(new_config.redaction.clone());
        tracing::info!(
            cookie_blacklist = new_config.redaction.cookie_blacklist.len(),
            anonymized_query_params = new_config.redaction.anonymized_query_params.len(),
            "Redaction policy reloaded"
        );

        if restart_required(&current, &new_config) {
            tracing::warn!("Config change outside [redaction] takes effect after restart");
        }
        current = new_config;
    }
}

fn restart_required(old: &TelemetryConfig, new: &TelemetryConfig) -> bool {
    let mut old = old.clone();
    old.redaction = new.redaction.clone();
    match (serde_json::to_value(&old), serde_json::to_value(new)) {
        (Ok(a), Ok(b)) => a != b,
        _ => true,
    }
}
