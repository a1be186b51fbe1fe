//! Vault File Watcher
//!
//! Monitors the vault for markdown changes, re-indexes, and notifies a callback.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::indexer::VaultError;
use super::provider::SharedVault;

/// Quiet period before a burst of file events is handled
pub const WATCH_DEBOUNCE: Duration = Duration::from_secs(2);

/// Change notification handed to the callback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultChangeEvent {
    pub paths: Vec<String>,
    pub reindexed: bool,
}

/// Keeps the debouncer alive; dropping it stops watching
pub struct VaultWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl VaultWatcher {
    pub fn start<F>(vault: SharedVault, on_change: F) -> Result<Self, VaultError>
    where
        F: Fn(VaultChangeEvent) + Send + 'static,
    {
        let vault_path = vault.snapshot().vault_path;
        let watched = vault.clone();

        let mut debouncer = new_debouncer(
            WATCH_DEBOUNCE,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    let paths: Vec<String> = events
                        .iter()
                        .filter_map(|e| e.path.to_str().map(|s| s.to_string()))
                        .filter(|p| p.ends_with(".md"))
                        .collect();

                    if !paths.is_empty() {
                        let reindexed = match watched.reindex() {
                            Ok(_) => true,
                            Err(e) => {
                                warn!(error = %e, "Re-index after vault change failed");
                                false
                            }
                        };
                        on_change(VaultChangeEvent { paths, reindexed });
                    }
                }
                Err(e) => warn!(error = %e, "Vault watch error"),
            },
        )?;

        debouncer.watcher().watch(&vault_path, RecursiveMode::Recursive)?;
        info!(vault = %vault_path.display(), "Watching vault");

        Ok(Self { _debouncer: debouncer })
    }
}
