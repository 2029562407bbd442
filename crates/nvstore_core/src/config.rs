//! Store configuration.

use crate::error::{StoreError, StoreResult};
use nvstore_fs::MountConfig;
use nvstore_kv::KEY_MAX_LEN;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default partition label of the key-value backend.
pub const DEFAULT_KV_PARTITION: &str = "nvs_key";

/// Default extension of record files.
pub const DEFAULT_RECORD_EXTENSION: &str = "dat";

/// Where the key-value engine keeps its partitions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineConfig {
    /// Volatile; lost when the process exits.
    #[default]
    Memory,
    /// Partition images in a host directory.
    File {
        /// Directory holding the images.
        dir: PathBuf,
    },
}

/// Configuration of the key-value backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KvConfig {
    /// Partition label.
    pub partition: String,
    /// Engine selection.
    pub engine: EngineConfig,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            partition: DEFAULT_KV_PARTITION.to_owned(),
            engine: EngineConfig::Memory,
        }
    }
}

impl KvConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the partition label.
    #[must_use]
    pub fn partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    /// Stores partitions as files under `dir`.
    #[must_use]
    pub fn file_engine(mut self, dir: impl Into<PathBuf>) -> Self {
        self.engine = EngineConfig::File { dir: dir.into() };
        self
    }
}

/// Configuration of the record-store backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Volume mount parameters.
    pub mount: MountConfig,
    /// Directory of record files, relative to the mount root.
    pub records_dir: PathBuf,
    /// Extension of record files, without the dot.
    pub extension: String,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            mount: MountConfig::default(),
            records_dir: PathBuf::new(),
            extension: DEFAULT_RECORD_EXTENSION.to_owned(),
        }
    }
}

impl RecordConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the mount parameters.
    #[must_use]
    pub fn mount(mut self, mount: MountConfig) -> Self {
        self.mount = mount;
        self
    }

    /// Sets the records directory.
    #[must_use]
    pub fn records_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.records_dir = dir.into();
        self
    }
}

/// Which backend a store uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Typed key-value flash store.
    KeyValue(KvConfig),
    /// Record files on a volume.
    Records(RecordConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::KeyValue(KvConfig::default())
    }
}

/// Configuration for a [`StorageManager`](crate::StorageManager).
///
/// # Example
///
/// ```rust
/// use nvstore_core::{KvConfig, StoreConfig};
///
/// let config = StoreConfig::new("settings").key_value(KvConfig::new().partition("nvs"));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store name. The key-value backend uses it as its namespace.
    pub name: String,
    /// Backend selection.
    pub backend: BackendConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "storage".to_owned(),
            backend: BackendConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Creates a key-value configuration named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Selects the key-value backend.
    #[must_use]
    pub fn key_value(mut self, config: KvConfig) -> Self {
        self.backend = BackendConfig::KeyValue(config);
        self
    }

    /// Selects the record-store backend.
    #[must_use]
    pub fn records(mut self, config: RecordConfig) -> Self {
        self.backend = BackendConfig::Records(config);
        self
    }

    /// Checks the configuration before any backend is built.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] for an empty or oversized
    /// name, and a volume configuration error for bad mount parameters.
    pub fn validate(&self) -> StoreResult<()> {
        if self.name.is_empty() {
            return Err(StoreError::invalid_argument("store name must not be empty"));
        }
        match &self.backend {
            BackendConfig::KeyValue(kv) => {
                if self.name.len() > KEY_MAX_LEN {
                    return Err(StoreError::invalid_argument(format!(
                        "namespace {:?} is longer than {KEY_MAX_LEN} bytes",
                        self.name
                    )));
                }
                if kv.partition.is_empty() {
                    return Err(StoreError::invalid_argument("partition must not be empty"));
                }
            }
            BackendConfig::Records(records) => {
                records.mount.validate()?;
                if records.extension.is_empty() || records.extension.contains(['.', '/']) {
                    return Err(StoreError::invalid_argument(format!(
                        "bad record extension {:?}",
                        records.extension
                    )));
                }
            }
        }
        Ok(())
    }
}
