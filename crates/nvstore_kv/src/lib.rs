//! # nvstore key-value engines
//!
//! Typed values and the flash key-value engines the key-value backend of
//! `nvstore_core` sits on.
//!
//! The engine is the low-level collaborator: it owns page management and
//! persistence. This crate defines what the store needs from it
//! ([`KvEngine`]) and ships two host implementations.
//!
//! ## Available Engines
//!
//! - [`MemoryEngine`] - volatile, with fault injection for tests
//! - [`FileEngine`] - one checksummed CBOR image per partition
//!
//! ## Example
//!
//! ```rust
//! use nvstore_kv::{TypedValue, ValueType};
//!
//! let bytes = TypedValue::U32(42).encode();
//! assert_eq!(bytes, [42, 0, 0, 0]);
//! assert_eq!(TypedValue::decode(ValueType::U32, &bytes).unwrap(), TypedValue::U32(42));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod file;
mod memory;
mod partition;
mod value;

pub use engine::{KvEngine, NamespaceHandle};
pub use error::{EngineError, EngineResult};
pub use file::FileEngine;
pub use memory::MemoryEngine;
pub use partition::{Entry, KEY_MAX_LEN};
pub use value::{TypedValue, ValueType};
