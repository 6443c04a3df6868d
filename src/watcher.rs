//! Stub configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Watches a stub configuration file and signals every change.
///
/// The parent directory is watched so editors that replace the file on save
/// are still noticed. Receivers decide when to reload.
pub struct StubWatcher {
    path: PathBuf,
    poll_interval: Duration,
    change_tx: mpsc::UnboundedSender<()>,
}

impl StubWatcher {
    /// Create a new StubWatcher.
    ///
    /// Returns the watcher and a receiver that gets one message per change.
    pub fn new(path: &Path, poll_interval: Duration) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        (
            Self {
                path,
                poll_interval,
                change_tx,
            },
            change_rx,
        )
    }

    /// Start watching. Changes are signalled until the returned watcher is
    /// dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_change_of(&event, &path) => {
                    info!(path = %path.display(), "Stub configuration change detected");
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(e) => error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        let dir = self.path.parent().unwrap_or(self.path.as_path());
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        info!(path = ?self.path, "Stub watcher started");
        Ok(watcher)
    }
}

/// Whether `event` creates or modifies `path`.
fn is_change_of(event: &Event, path: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create()) && event.paths.iter().any(|p| p == path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, EventKind, ModifyKind, RemoveKind};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_only_changes_of_the_watched_file_count() {
        let path = PathBuf::from("/stubs/stubs.yaml");
        let modify = || EventKind::Modify(ModifyKind::Data(DataChange::Content));

        assert!(is_change_of(&Event::new(modify()).add_path(path.clone()), &path));
        assert!(is_change_of(
            &Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone()),
            &path
        ));
        assert!(!is_change_of(
            &Event::new(modify()).add_path(PathBuf::from("/stubs/other.yaml")),
            &path
        ));
        assert!(!is_change_of(
            &Event::new(EventKind::Remove(RemoveKind::File)).add_path(path.clone()),
            &path
        ));
        assert!(!is_change_of(
            &Event::new(EventKind::Access(AccessKind::Any)).add_path(path.clone()),
            &path
        ));
    }

    #[tokio::test]
    async fn test_signals_file_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stubs.yaml");
        fs::write(&path, "request:\n  url: /one\n").unwrap();

        let (watcher, mut changes) = StubWatcher::new(&path, Duration::from_millis(50));
        let _watcher = watcher.run().unwrap();

        fs::write(&path, "request:\n  url: /two\n").unwrap();
        let change = tokio::time::timeout(Duration::from_secs(10), changes.recv()).await;
        assert_eq!(change.unwrap(), Some(()));
    }
}
