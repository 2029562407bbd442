//! Error types for nvstore core.

use nvstore_fs::FsError;
use nvstore_kv::{EngineError, ValueType};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Small integer codes for store errors.
///
/// These are what a C caller or a log line sees; [`StoreError::code`] maps
/// every error onto one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Success.
    Ok = 0,
    /// No backend handle is open, or the backend is not ready.
    InvalidHandle = -1,
    /// An argument is unusable.
    InvalidArgument = -2,
    /// The identifier has no stored value.
    NotFound = -3,
    /// The backend rejected a write.
    WriteFailed = -4,
    /// A write was staged but could not be committed.
    CommitFailed = -5,
    /// The volume could not be mounted.
    MountFailed = -6,
    /// The stored value has another type.
    TypeMismatch = -7,
    /// The stored value does not fit the caller's buffer.
    Truncated = -8,
    /// The device underneath the volume failed.
    DeviceFault = -9,
    /// Any other I/O failure.
    Io = -10,
}

impl ErrorCode {
    /// The numeric value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No backend handle is open, or the backend is not ready.
    #[error("no open backend handle")]
    InvalidHandle,

    /// An argument is unusable.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// Nothing is stored under the identifier.
    #[error("not found: {id}")]
    NotFound {
        /// The identifier.
        id: String,
    },

    /// The stored value is not of the requested type.
    #[error("type mismatch for {id}: expected {expected}, stored {actual:?}")]
    TypeMismatch {
        /// The identifier.
        id: String,
        /// The requested type.
        expected: ValueType,
        /// The stored type, when the backend records it.
        actual: Option<ValueType>,
    },

    /// The stored value is larger than the caller's capacity.
    #[error("value {id} needs {needed} bytes, capacity is {capacity}")]
    Truncated {
        /// The identifier.
        id: String,
        /// Bytes the stored value occupies.
        needed: usize,
        /// Bytes the caller offered.
        capacity: usize,
    },

    /// The engine rejected a write.
    #[error("write of {id} failed: {source}")]
    WriteFailed {
        /// The identifier.
        id: String,
        /// The engine error.
        source: EngineError,
    },

    /// A write was staged but the commit failed; the value is not stored.
    #[error("commit of {id} failed: {source}")]
    CommitFailed {
        /// The identifier.
        id: String,
        /// The engine error.
        source: EngineError,
    },

    /// Key-value engine error.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Volume error.
    #[error("volume error: {0}")]
    Fs(#[from] FsError),
}

impl StoreError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Maps an engine error for `id` onto the store taxonomy.
    pub fn from_engine(id: &str, error: EngineError) -> Self {
        match error {
            EngineError::NotFound { .. } => Self::not_found(id),
            EngineError::TypeMismatch { expected, actual } => Self::TypeMismatch {
                id: id.to_owned(),
                expected,
                actual,
            },
            EngineError::InvalidArgument { message } => Self::InvalidArgument { message },
            EngineError::InvalidHandle => Self::InvalidHandle,
            other => Self::Engine(other),
        }
    }

    /// Maps a volume error for `id` onto the store taxonomy.
    pub fn from_fs(id: &str, error: FsError) -> Self {
        match error {
            FsError::NotMounted => Self::InvalidHandle,
            FsError::NotFound { .. } => Self::not_found(id),
            FsError::InvalidPath { path } => {
                Self::invalid_argument(format!("invalid record path {}", path.display()))
            }
            other => Self::Fs(other),
        }
    }

    /// The small integer code of this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::InvalidHandle => ErrorCode::InvalidHandle,
            StoreError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            StoreError::NotFound { .. } => ErrorCode::NotFound,
            StoreError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            StoreError::Truncated { .. } => ErrorCode::Truncated,
            StoreError::WriteFailed { .. } => ErrorCode::WriteFailed,
            StoreError::CommitFailed { .. } => ErrorCode::CommitFailed,
            StoreError::Engine(e) => match e {
                EngineError::NotFound { .. } => ErrorCode::NotFound,
                EngineError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
                EngineError::InvalidArgument { .. } | EngineError::InvalidLength { .. } => {
                    ErrorCode::InvalidArgument
                }
                EngineError::InvalidHandle | EngineError::NotInitialized { .. } => {
                    ErrorCode::InvalidHandle
                }
                _ => ErrorCode::Io,
            },
            StoreError::Fs(e) => match e {
                FsError::NotMounted => ErrorCode::InvalidHandle,
                FsError::MountFailed { .. } => ErrorCode::MountFailed,
                FsError::DeviceFault { .. } => ErrorCode::DeviceFault,
                FsError::NotFound { .. } | FsError::SourceNotFound { .. } => ErrorCode::NotFound,
                FsError::InvalidConfig { .. }
                | FsError::InvalidPath { .. }
                | FsError::InvalidArgument { .. }
                | FsError::DestinationExists { .. } => ErrorCode::InvalidArgument,
                FsError::Io(_) | FsError::TooManyOpenFiles { .. } => ErrorCode::Io,
            },
        }
    }

    /// The engine's own error code, when the error came from the engine.
    #[must_use]
    pub fn native_code(&self) -> Option<i32> {
        match self {
            StoreError::WriteFailed { source, .. } | StoreError::CommitFailed { source, .. } => {
                Some(source.native_code())
            }
            StoreError::Engine(e) => Some(e.native_code()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_their_meaning() {
        let err = StoreError::from_engine("counter", EngineError::not_found("counter"));
        assert!(matches!(err, StoreError::NotFound { ref id } if id == "counter"));
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = StoreError::from_engine(
            "counter",
            EngineError::TypeMismatch {
                expected: ValueType::I8,
                actual: Some(ValueType::U32),
            },
        );
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
    }

    #[test]
    fn commit_failure_reports_native_code() {
        let err = StoreError::CommitFailed {
            id: "k".into(),
            source: EngineError::NoFreePages {
                partition: "nvs".into(),
            },
        };
        assert_eq!(err.code(), ErrorCode::CommitFailed);
        assert_eq!(err.native_code(), Some(0x110d));
    }

    #[test]
    fn volume_errors_map_to_codes() {
        assert_eq!(
            StoreError::from_fs("k", FsError::NotMounted).code(),
            ErrorCode::InvalidHandle
        );
        let mount = StoreError::Fs(FsError::MountFailed {
            label: "fat".into(),
            reason: "blank".into(),
        });
        assert_eq!(mount.code(), ErrorCode::MountFailed);
        assert_eq!(mount.native_code(), None);
    }

    #[test]
    fn codes_are_small_negative_integers() {
        assert_eq!(ErrorCode::Ok.as_i32(), 0);
        assert_eq!(ErrorCode::InvalidHandle.as_i32(), -1);
        assert_eq!(ErrorCode::Io.as_i32(), -10);
    }
}
