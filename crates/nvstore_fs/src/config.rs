//! Mount parameters.

use crate::error::{FsError, FsResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum length of a volume label in bytes.
pub const MAX_LABEL_LEN: usize = 50;

/// Maximum length of the mount root in bytes.
pub const MAX_ROOT_LEN: usize = 50;

/// Parameters for mounting a volume.
///
/// Supplied when the [`Volume`](crate::Volume) is created and immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Partition label of the volume.
    pub label: String,

    /// Directory the volume is mounted at.
    pub root: PathBuf,

    /// Maximum number of simultaneously open files.
    pub max_files: usize,

    /// Whether a volume without a usable file system is formatted on mount.
    pub format_if_mount_failed: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            label: "fat".to_owned(),
            root: PathBuf::from("fat"),
            max_files: 4,
            format_if_mount_failed: false,
        }
    }
}

impl MountConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the partition label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the mount root.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets the open-file limit.
    #[must_use]
    pub const fn max_files(mut self, value: usize) -> Self {
        self.max_files = value;
        self
    }

    /// Sets whether to format when mounting fails for lack of a file system.
    #[must_use]
    pub const fn format_if_mount_failed(mut self, value: bool) -> Self {
        self.format_if_mount_failed = value;
        self
    }

    /// Checks the bounds of every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> FsResult<()> {
        if self.label.is_empty() || self.label.len() > MAX_LABEL_LEN {
            return Err(FsError::invalid_config(format!(
                "label must be 1..={MAX_LABEL_LEN} bytes, got {}",
                self.label.len()
            )));
        }
        let root_len = self.root.as_os_str().len();
        if root_len == 0 || root_len > MAX_ROOT_LEN {
            return Err(FsError::invalid_config(format!(
                "root must be 1..={MAX_ROOT_LEN} bytes, got {root_len}"
            )));
        }
        if self.max_files == 0 {
            return Err(FsError::invalid_config("max_files must be at least 1"));
        }
        Ok(())
    }
}
