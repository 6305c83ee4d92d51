//! Route table watcher for hot reload.
//!
//! Each modification of the watched file is re-parsed and re-validated; only
//! tables that pass validation are forwarded to the server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RoutingConfig;

/// Watches one route table file.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RoutingConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded tables.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RoutingConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_reload_trigger(&event.kind) => {
                    if !reload(&path, &tx) {
                        tracing::debug!(path = ?path, "Route table update not forwarded");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Route table watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Route table watcher started");
        Ok(watcher)
    }
}

fn is_reload_trigger(kind: &EventKind) -> bool {
    kind.is_modify() || kind.is_create()
}

/// Load the table and forward it; a bad table keeps the current routes.
fn reload(path: &Path, tx: &mpsc::UnboundedSender<RoutingConfig>) -> bool {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = ?path, routes = config.routes.len(), "Route table reloaded");
            tx.send(config).is_ok()
        }
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Failed to reload route table, keeping current routes");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    #[test]
    fn test_reload_triggers() {
        assert!(is_reload_trigger(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_reload_trigger(&EventKind::Create(CreateKind::File)));
        assert!(!is_reload_trigger(&EventKind::Access(AccessKind::Any)));
    }

    #[test]
    fn test_reload_forwards_valid_tables_only() {
        let dir = std::env::temp_dir().join(format!("path-router-watch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("routes.toml");
        let (watcher, mut rx) = ConfigWatcher::new(&file);

        std::fs::write(&file, "[[routes]]\npath = \"/a\"\n").unwrap();
        assert!(reload(&file, &watcher.update_tx));
        assert_eq!(rx.try_recv().unwrap().routes[0].path, "/a");

        std::fs::write(&file, "[[routes]]\npath = \"a\"\n").unwrap();
        assert!(!reload(&file, &watcher.update_tx));
        assert!(rx.try_recv().is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
