//! Current stub configuration, swappable on reload.
//!
//! Readers take an `Arc` snapshot and keep using it for the whole request;
//! a reload parses the new configuration completely before publishing it, so
//! nobody ever observes a half-loaded sequence.

use crate::error::StubConfigError;
use crate::matcher::Matcher;
use crate::yaml::{self, LoadedConfig};
use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A loaded configuration together with its compiled matcher.
#[derive(Debug)]
pub struct StubSnapshot {
    pub config: LoadedConfig,
    pub matcher: Matcher,
}

impl StubSnapshot {
    pub fn new(config: LoadedConfig) -> Self {
        let matcher = Matcher::new(&config.lifecycles);
        Self { config, matcher }
    }
}

/// Holds the active [`StubSnapshot`].
#[derive(Debug)]
pub struct StubStore {
    current: ArcSwap<StubSnapshot>,
}

impl StubStore {
    pub fn new(config: LoadedConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(StubSnapshot::new(config)),
        }
    }

    /// Load the initial configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StubConfigError> {
        Ok(Self::new(yaml::load_file(path)?))
    }

    /// The active snapshot.
    pub fn load(&self) -> Arc<StubSnapshot> {
        self.current.load_full()
    }

    /// Publish a new configuration, returning the one it replaced.
    pub fn replace(&self, config: LoadedConfig) -> Arc<StubSnapshot> {
        let lifecycles = config.len();
        let previous = self.current.swap(Arc::new(StubSnapshot::new(config)));
        info!(
            lifecycles,
            previous = previous.config.len(),
            "Stub configuration replaced"
        );
        previous
    }

    /// Re-read the active configuration's source file and publish it.
    ///
    /// On failure the active snapshot stays in place. Returns the number of
    /// lifecycles now loaded.
    pub fn reload(&self) -> Result<usize, StubConfigError> {
        let source = self
            .load()
            .config
            .source
            .clone()
            .ok_or(StubConfigError::NoSource)?;
        let config = yaml::load_file(&source)?;
        let lifecycles = config.len();
        self.replace(config);
        Ok(lifecycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::IncomingRequest;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_replace_publishes_new_snapshot() {
        let store = StubStore::new(yaml::parse_str("request:\n  url: /old\nresponse:\n  status: 200"));
        let held = store.load();

        let previous = store.replace(yaml::parse_str(
            "request:\n  url: /new\nresponse:\n  status: 200\nrequest:\n  url: /other",
        ));

        assert!(Arc::ptr_eq(&held, &previous));
        // Snapshots taken before the swap are unchanged
        assert_eq!(held.config.lifecycles[0].request.url, "/old");

        let current = store.load();
        assert_eq!(current.config.len(), 2);
        let request = IncomingRequest::new("GET", "/new");
        assert!(current
            .matcher
            .find_match(&current.config.lifecycles, &request)
            .is_some());
    }

    #[test]
    fn test_reload_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stubs.yaml");
        fs::write(&path, "request:\n  url: /one\n").unwrap();

        let store = StubStore::from_file(&path).unwrap();
        assert_eq!(store.load().config.len(), 1);

        fs::write(&path, "request:\n  url: /one\nrequest:\n  url: /two\n").unwrap();
        assert_eq!(store.reload().unwrap(), 2);
        assert_eq!(store.load().config.lifecycles[1].request.url, "/two");
    }

    #[test]
    fn test_failed_reload_keeps_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stubs.yaml");
        fs::write(&path, "request:\n  url: /one\n").unwrap();

        let store = StubStore::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(matches!(store.reload(), Err(StubConfigError::Read { .. })));
        assert_eq!(store.load().config.lifecycles[0].request.url, "/one");
    }

    #[test]
    fn test_reload_without_source() {
        let store = StubStore::new(yaml::parse_str("request:\n  url: /a"));
        assert!(matches!(store.reload(), Err(StubConfigError::NoSource)));
    }
}
