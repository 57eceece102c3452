//! Process-wide configuration holder with atomic snapshot swaps

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use super::snapshot::ConfigSnapshot;
use super::types::EngineConfig;
use crate::error::ConfigResult;

/// Holds the current configuration snapshot.
///
/// Readers clone the `Arc` and release the lock immediately; a reload builds
/// and validates the new snapshot without blocking readers, then replaces the
/// pointer in one write. Writers are serialized so versions stay monotonic.
/// Snapshots already handed out are never touched.
#[derive(Debug)]
pub struct ConfigStore {
    current: RwLock<Arc<ConfigSnapshot>>,
    writer: Mutex<()>,
}

impl ConfigStore {
    /// Validate `config` and install it as version 1.
    pub fn new(config: EngineConfig) -> ConfigResult<Self> {
        let snapshot = ConfigSnapshot::build(config, 1)?;
        info!(version = 1, "configuration loaded");
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        })
    }

    /// Load and install a JSON configuration file as version 1.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::new(EngineConfig::from_path(path)?)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.read().clone()
    }

    /// Current version
    pub fn version(&self) -> u64 {
        self.current.read().version()
    }

    /// Validate `config` and swap it in as the next version.
    ///
    /// On error the current snapshot stays in place.
    pub fn replace(&self, config: EngineConfig) -> ConfigResult<u64> {
        let _writer = self.writer.lock();
        let version = self.version() + 1;
        let snapshot = Arc::new(ConfigSnapshot::build(config, version)?);
        *self.current.write() = snapshot;
        info!(version, "configuration swapped");
        Ok(version)
    }

    /// Reload from a JSON configuration file.
    pub fn reload_from_path(&self, path: impl AsRef<Path>) -> ConfigResult<u64> {
        self.replace(EngineConfig::from_path(path)?)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self {
            current: RwLock::new(Arc::new(ConfigSnapshot::default())),
            writer: Mutex::new(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::Dimension;
    use crate::error::ConfigError;
    use std::io::Write;

    #[test]
    fn test_replace_bumps_version() {
        let store = ConfigStore::default();
        assert_eq!(store.version(), 1);

        let v = store.replace(EngineConfig::default()).unwrap();
        assert_eq!(v, 2);
        assert_eq!(store.snapshot().version(), 2);
    }

    #[test]
    fn test_old_snapshot_survives_swap() {
        let store = ConfigStore::default();
        let before = store.snapshot();

        let mut config = EngineConfig::default();
        config.bands.reliable_min = 0.8;
        store.replace(config).unwrap();

        assert_eq!(before.version(), 1);
        assert_eq!(before.config().bands.reliable_min, 0.70);
        assert_eq!(store.snapshot().config().bands.reliable_min, 0.8);
    }

    #[test]
    fn test_failed_replace_keeps_current() {
        let store = ConfigStore::default();
        let mut config = EngineConfig::default();
        config
            .dimensions
            .get_mut(&Dimension::Fraud)
            .unwrap()
            .weight = 0.5;

        assert!(matches!(
            store.replace(config),
            Err(ConfigError::WeightSum { .. })
        ));
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn test_concurrent_replaces_get_distinct_versions() {
        let store = ConfigStore::default();
        let mut versions: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| store.replace(EngineConfig::default()).unwrap()))
                .collect();
            // Readers are served while writers build
            assert!(store.snapshot().version() >= 1);
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        versions.sort();
        assert_eq!(versions, (2..=9).collect::<Vec<u64>>());
        assert_eq!(store.version(), 9);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = EngineConfig::default().to_json_pretty().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let store = ConfigStore::from_path(file.path()).unwrap();
        assert_eq!(store.version(), 1);
        assert_eq!(store.reload_from_path(file.path()).unwrap(), 2);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ConfigStore::from_path("/nonexistent/nobias.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
