//! Error types for the key-value engine.

use crate::value::ValueType;
use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by a [`KvEngine`](crate::KvEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The partition has no free pages left; its page structure is full or
    /// corrupted and must be erased before it can be initialised.
    #[error("no free pages in partition {partition}")]
    NoFreePages {
        /// The partition label.
        partition: String,
    },

    /// The partition has not been initialised.
    #[error("partition {partition} is not initialised")]
    NotInitialized {
        /// The partition label.
        partition: String,
    },

    /// No entry is stored under the key.
    #[error("key not found: {key}")]
    NotFound {
        /// The requested key.
        key: String,
    },

    /// The entry exists but holds a different type, or its bytes do not
    /// form a value of the requested type.
    #[error("type mismatch: expected {expected}, stored {actual:?}")]
    TypeMismatch {
        /// The requested type.
        expected: ValueType,
        /// The stored type, when known.
        actual: Option<ValueType>,
    },

    /// A scalar had the wrong number of bytes.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Width required by the type.
        expected: usize,
        /// Width supplied.
        actual: usize,
    },

    /// The namespace handle is closed or belongs to another partition.
    #[error("invalid namespace handle")]
    InvalidHandle,

    /// A key, namespace or argument is malformed.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// Another process holds the partition image.
    #[error("partition {partition} is locked by another process")]
    Locked {
        /// The partition label.
        partition: String,
    },

    /// The partition image could not be encoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// An I/O error occurred underneath the engine.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// The flash engine's numeric error code for this error.
    ///
    /// Codes follow the ESP-IDF NVS numbering so they can be compared with
    /// firmware logs.
    #[must_use]
    pub fn native_code(&self) -> i32 {
        match self {
            EngineError::NotInitialized { .. } => 0x1101,
            EngineError::NotFound { .. } => 0x1102,
            EngineError::TypeMismatch { .. } => 0x1103,
            EngineError::InvalidArgument { .. } => 0x1106,
            EngineError::InvalidHandle => 0x1107,
            EngineError::InvalidLength { .. } => 0x110c,
            EngineError::NoFreePages { .. } => 0x110d,
            EngineError::Locked { .. } => 0x110b,
            EngineError::Codec(_) | EngineError::Io(_) => -1,
        }
    }
}
