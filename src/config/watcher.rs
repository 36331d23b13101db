//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ClientConfig;

/// Watches a config file and emits every successfully re-validated version.
///
/// Invalid edits are logged and dropped; the client keeps running on the
/// last good configuration.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<ClientConfig>,
}

impl ConfigWatcher {
    /// Create a watcher for `path` plus the receiving end of its updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ClientConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                updates,
            },
            rx,
        )
    }

    /// Start watching. Drop the returned handle to stop.
    ///
    /// The parent directory is watched rather than the file itself so that
    /// editors which replace the file (write temp + rename) are still seen.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let target = self.path.clone();
        let updates = self.updates;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut last_applied: Option<String> = None;
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = ?e, "Config watch error");
                        return;
                    }
                };
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                if !event.paths.iter().any(|p| p.file_name() == target.file_name()) {
                    return;
                }

                match load_config(&target) {
                    Ok(config) => {
                        // Editors often emit several events per save.
                        let rendered = toml::to_string(&config).ok();
                        if rendered.is_some() && rendered == last_applied {
                            return;
                        }
                        last_applied = rendered;
                        tracing::info!(path = ?target, "Config reloaded");
                        let _ = updates.send(config);
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = ?target,
                            error = %e,
                            "Config reload rejected, keeping current configuration"
                        );
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
