//! Volume driver trait and the host implementation.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// File that marks a host directory as a formatted volume.
pub const FORMAT_MARKER: &str = "format_info.txt";

/// Why a driver could not mount a volume.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The partition holds no valid file system. Formatting may help.
    #[error("no file system: {reason}")]
    NoFilesystem {
        /// What was found instead.
        reason: String,
    },

    /// The device or partition itself failed. Formatting will not help.
    #[error("device error: {0}")]
    Device(#[from] io::Error),
}

/// The physical file-system driver underneath a [`Volume`](crate::Volume).
///
/// Drivers bring a partition up at a mount root, after which its files are
/// reachable through ordinary file APIs under that root. Implementations
/// must tell a missing or corrupt file system
/// ([`DriverError::NoFilesystem`]) apart from a device failure
/// ([`DriverError::Device`]); only the former is answered with a format.
pub trait VolumeDriver: Send + fmt::Debug {
    /// Brings the partition up at `root`.
    fn mount(&mut self, label: &str, root: &Path) -> Result<(), DriverError>;

    /// Destroys the partition contents and writes an empty file system.
    fn format(&mut self, label: &str, root: &Path) -> Result<(), DriverError>;

    /// Takes the partition down.
    fn unmount(&mut self, root: &Path) -> Result<(), DriverError>;

    /// Whether `name` in the root directory belongs to the driver rather
    /// than to the user. Such files are hidden from listings.
    fn is_reserved(&self, name: &str) -> bool {
        let _ = name;
        false
    }
}

impl<D: VolumeDriver + ?Sized> VolumeDriver for Box<D> {
    fn mount(&mut self, label: &str, root: &Path) -> Result<(), DriverError> {
        (**self).mount(label, root)
    }

    fn format(&mut self, label: &str, root: &Path) -> Result<(), DriverError> {
        (**self).format(label, root)
    }

    fn unmount(&mut self, root: &Path) -> Result<(), DriverError> {
        (**self).unmount(root)
    }

    fn is_reserved(&self, name: &str) -> bool {
        (**self).is_reserved(name)
    }
}

/// A driver that uses a host directory as the partition.
///
/// The directory must exist (a missing directory is a device error). It is
/// considered formatted when [`FORMAT_MARKER`] holds the signature for the
/// volume label; formatting empties the directory and writes the marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostDriver;

impl HostDriver {
    /// Creates a host driver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn signature(label: &str) -> String {
        format!("Formatted correctly: {label}\n")
    }
}

impl VolumeDriver for HostDriver {
    fn mount(&mut self, label: &str, root: &Path) -> Result<(), DriverError> {
        let meta = fs::metadata(root)?;
        if !meta.is_dir() {
            return Err(DriverError::Device(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            )));
        }

        match fs::read_to_string(root.join(FORMAT_MARKER)) {
            Ok(content) if content == Self::signature(label) => Ok(()),
            Ok(_) => Err(DriverError::NoFilesystem {
                reason: "format marker does not match the label".to_owned(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(DriverError::NoFilesystem {
                reason: "format marker missing".to_owned(),
            }),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(DriverError::NoFilesystem {
                reason: "format marker unreadable".to_owned(),
            }),
            Err(e) => Err(DriverError::Device(e)),
        }
    }

    fn format(&mut self, label: &str, root: &Path) -> Result<(), DriverError> {
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
        fs::write(root.join(FORMAT_MARKER), Self::signature(label))?;
        Ok(())
    }

    fn unmount(&mut self, _root: &Path) -> Result<(), DriverError> {
        Ok(())
    }

    fn is_reserved(&self, name: &str) -> bool {
        name == FORMAT_MARKER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn host_empty_directory_has_no_filesystem() {
        let dir = tempdir().unwrap();
        let result = HostDriver::new().mount("fat", dir.path());
        assert!(matches!(result, Err(DriverError::NoFilesystem { .. })));
    }

    #[test]
    fn host_missing_directory_is_a_device_error() {
        let dir = tempdir().unwrap();
        let result = HostDriver::new().mount("fat", &dir.path().join("absent"));
        assert!(matches!(result, Err(DriverError::Device(_))));
    }

    #[test]
    fn host_format_then_mount() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("junk.bin"), b"junk").unwrap();
        fs::create_dir(dir.path().join("old")).unwrap();

        let mut driver = HostDriver::new();
        driver.format("fat", dir.path()).unwrap();
        assert!(!dir.path().join("junk.bin").exists());
        assert!(!dir.path().join("old").exists());
        driver.mount("fat", dir.path()).unwrap();
    }

    #[test]
    fn host_marker_is_bound_to_label() {
        let dir = tempdir().unwrap();
        let mut driver = HostDriver::new();
        driver.format("fat", dir.path()).unwrap();
        assert!(matches!(
            driver.mount("logs", dir.path()),
            Err(DriverError::NoFilesystem { .. })
        ));
    }
}
