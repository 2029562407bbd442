//! Backend selection.

use crate::config::{BackendConfig, EngineConfig, StoreConfig};
use crate::contract::{NvStore, StoreSession};
use crate::error::StoreResult;
use crate::kv_store::{KvSession, KvStore};
use crate::record_store::{RecordSession, RecordStore};
use nvstore_fs::{HostDriver, Volume, VolumeDriver};
use nvstore_kv::{FileEngine, KvEngine, MemoryEngine, TypedValue, ValueType};
use std::sync::Arc;
use tracing::info;

/// The storage manager: one backend chosen at construction.
///
/// There is no process-wide instance. Build one from a [`StoreConfig`] and
/// hand it to every consumer, typically as an `Arc<StorageManager>`.
#[derive(Debug)]
pub enum StorageManager {
    /// Typed key-value flash store.
    KeyValue(KvStore),
    /// Record files on a volume.
    Records(RecordStore),
}

impl StorageManager {
    /// Builds the backend described by `config`. Call
    /// [`init`](NvStore::init) before use.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the engine
    /// directory cannot be created.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let manager = match &config.backend {
            BackendConfig::KeyValue(kv) => {
                let engine: Box<dyn KvEngine> = match &kv.engine {
                    EngineConfig::Memory => Box::new(MemoryEngine::new()),
                    EngineConfig::File { dir } => Box::new(FileEngine::open(dir)?),
                };
                Self::KeyValue(KvStore::new(&config.name, kv, engine)?)
            }
            BackendConfig::Records(records) => {
                let driver: Box<dyn VolumeDriver> = Box::new(HostDriver::new());
                let volume = Arc::new(Volume::new(records.mount.clone(), driver)?);
                Self::Records(RecordStore::new(&config.name, volume, records))
            }
        };
        info!(name = %config.name, backend = manager.backend_name(), "storage manager created");
        Ok(manager)
    }

    /// Short name of the active backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self {
            StorageManager::KeyValue(_) => "key_value",
            StorageManager::Records(_) => "records",
        }
    }

    /// The key-value backend, if active.
    #[must_use]
    pub fn key_value(&self) -> Option<&KvStore> {
        match self {
            StorageManager::KeyValue(store) => Some(store),
            StorageManager::Records(_) => None,
        }
    }

    /// The record backend, if active. Record sets are reached through it.
    #[must_use]
    pub fn records(&self) -> Option<&RecordStore> {
        match self {
            StorageManager::Records(store) => Some(store),
            StorageManager::KeyValue(_) => None,
        }
    }
}

impl NvStore for StorageManager {
    type Session<'a> = ManagerSession<'a>;

    fn name(&self) -> &str {
        match self {
            StorageManager::KeyValue(store) => store.name(),
            StorageManager::Records(store) => store.name(),
        }
    }

    fn init(&self) -> StoreResult<()> {
        match self {
            StorageManager::KeyValue(store) => store.init(),
            StorageManager::Records(store) => store.init(),
        }
    }

    fn ready(&self) -> bool {
        match self {
            StorageManager::KeyValue(store) => store.ready(),
            StorageManager::Records(store) => store.ready(),
        }
    }

    fn open(&self) -> StoreResult<ManagerSession<'_>> {
        Ok(match self {
            StorageManager::KeyValue(store) => ManagerSession::KeyValue(store.open()?),
            StorageManager::Records(store) => ManagerSession::Records(store.open()?),
        })
    }
}

/// A session on whichever backend the manager holds.
#[derive(Debug)]
pub enum ManagerSession<'a> {
    /// Key-value session.
    KeyValue(KvSession<'a, Box<dyn KvEngine>>),
    /// Record-store session.
    Records(RecordSession<'a, Box<dyn VolumeDriver>>),
}

impl StoreSession for ManagerSession<'_> {
    fn save(&mut self, id: &str, value: &TypedValue) -> StoreResult<usize> {
        match self {
            ManagerSession::KeyValue(s) => s.save(id, value),
            ManagerSession::Records(s) => s.save(id, value),
        }
    }

    fn restore(&mut self, id: &str, ty: ValueType, capacity: usize) -> StoreResult<TypedValue> {
        match self {
            ManagerSession::KeyValue(s) => s.restore(id, ty, capacity),
            ManagerSession::Records(s) => s.restore(id, ty, capacity),
        }
    }

    fn check_key(&mut self, id: &str) -> bool {
        match self {
            ManagerSession::KeyValue(s) => s.check_key(id),
            ManagerSession::Records(s) => s.check_key(id),
        }
    }

    fn remove_key(&mut self, id: &str) -> StoreResult<()> {
        match self {
            ManagerSession::KeyValue(s) => s.remove_key(id),
            ManagerSession::Records(s) => s.remove_key(id),
        }
    }

    fn erase(&mut self) -> StoreResult<()> {
        match self {
            ManagerSession::KeyValue(s) => s.erase(),
            ManagerSession::Records(s) => s.erase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KvConfig, RecordConfig};
    use crate::error::StoreError;
    use nvstore_fs::MountConfig;
    use tempfile::tempdir;

    #[test]
    fn memory_backend_by_default() {
        let manager = StorageManager::from_config(&StoreConfig::new("app")).unwrap();
        assert_eq!(manager.backend_name(), "key_value");
        assert_eq!(manager.name(), "app");
        assert!(manager.records().is_none());
        assert!(!manager.ready());
        manager.init().unwrap();
        assert!(manager.ready());
    }

    #[test]
    fn record_backend_from_config() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new("logbook").records(
            RecordConfig::new().mount(
                MountConfig::new()
                    .root(dir.path())
                    .format_if_mount_failed(true),
            ),
        );
        let manager = StorageManager::from_config(&config).unwrap();
        assert_eq!(manager.backend_name(), "records");
        manager.init().unwrap();

        manager.save("entry", &TypedValue::U64(5)).unwrap();
        assert!(dir.path().join("entry.dat").is_file());
        assert!(manager.records().is_some());
    }

    #[test]
    fn file_engine_persists_across_managers() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new("app").key_value(KvConfig::new().file_engine(dir.path()));

        {
            let manager = StorageManager::from_config(&config).unwrap();
            manager.init().unwrap();
            manager.save("boots", &TypedValue::U16(3)).unwrap();
        }

        let manager = StorageManager::from_config(&config).unwrap();
        manager.init().unwrap();
        assert_eq!(
            manager.restore("boots", ValueType::U16, 0).unwrap(),
            TypedValue::U16(3)
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = StorageManager::from_config(&StoreConfig::new("")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument { .. }));
    }
}
