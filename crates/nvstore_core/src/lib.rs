//! # nvstore core
//!
//! A non-volatile storage abstraction: named values persisted through one
//! contract, backed interchangeably by a typed key-value flash store or by
//! record files on a mountable volume.
//!
//! This crate provides:
//! - the capability contract ([`NvStore`], [`StoreSession`])
//! - the typed key-value backend ([`KvStore`])
//! - the record-store backend ([`RecordStore`], [`RecordSet`])
//! - [`StorageManager`], which picks a backend from a [`StoreConfig`]
//!
//! ## Locking
//!
//! Each store serializes access through one exclusive lock. One-shot calls
//! such as [`NvStore::save`] take it for a single operation;
//! [`NvStore::open`] returns a session that holds it until the session is
//! closed or dropped.
//!
//! ## Example
//!
//! ```rust
//! use nvstore_core::{NvStore, StorageManager, StoreConfig};
//! use nvstore_kv::{TypedValue, ValueType};
//! use std::sync::Arc;
//!
//! let manager = Arc::new(StorageManager::from_config(&StoreConfig::new("app")).unwrap());
//! manager.init().unwrap();
//!
//! manager.save("counter", &TypedValue::U32(42)).unwrap();
//! let mut buf = [0u8; 4];
//! assert_eq!(manager.restore_into("counter", ValueType::U32, &mut buf).unwrap(), 4);
//! assert_eq!(u32::from_le_bytes(buf), 42);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod contract;
mod error;
mod kv_store;
mod manager;
mod record_store;

pub use config::{
    BackendConfig, EngineConfig, KvConfig, RecordConfig, StoreConfig, DEFAULT_KV_PARTITION,
    DEFAULT_RECORD_EXTENSION,
};
pub use contract::{NvStore, StoreSession};
pub use error::{ErrorCode, StoreError, StoreResult};
pub use kv_store::{KvSession, KvStore};
pub use manager::{ManagerSession, StorageManager};
pub use record_store::{RecordSession, RecordSet, RecordStore};
