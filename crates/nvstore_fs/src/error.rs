//! Error types for volume operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for volume operations.
pub type FsResult<T> = Result<T, FsError>;

/// Errors that can occur on a [`Volume`](crate::Volume).
#[derive(Debug, Error)]
pub enum FsError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The volume is not mounted.
    #[error("volume is not mounted")]
    NotMounted,

    /// The volume has no usable file system and formatting was not allowed,
    /// or formatting did not produce a mountable volume.
    #[error("failed to mount volume {label}: {reason}")]
    MountFailed {
        /// The volume label.
        label: String,
        /// Why the mount failed.
        reason: String,
    },

    /// The device underneath the volume failed. Never answered with a format.
    #[error("device fault on volume {label}: {source}")]
    DeviceFault {
        /// The volume label.
        label: String,
        /// The underlying error.
        source: io::Error,
    },

    /// The mount parameters are invalid.
    #[error("invalid mount configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// The path escapes the volume root or is otherwise unusable.
    #[error("invalid path: {}", path.display())]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
    },

    /// An argument is unusable (for example an empty line buffer).
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The open-file limit of the volume is reached.
    #[error("too many open files (limit {max})")]
    TooManyOpenFiles {
        /// The configured limit.
        max: usize,
    },

    /// The file does not exist.
    #[error("file not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The source of a copy or rename does not exist.
    #[error("source file not found: {}", path.display())]
    SourceNotFound {
        /// The missing source.
        path: PathBuf,
    },

    /// The destination of a rename already exists.
    #[error("destination already exists: {}", path.display())]
    DestinationExists {
        /// The existing destination.
        path: PathBuf,
    },
}

impl FsError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
