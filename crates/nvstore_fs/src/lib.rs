//! # nvstore volumes
//!
//! File-system access layer for nvstore.
//!
//! A [`Volume`] wraps a mountable partition and offers the primitive file
//! operations the record-store backend needs. Every primitive takes the
//! volume lock for the duration of that one call, so a `Volume` can be
//! shared freely between threads.
//!
//! ## Mounting
//!
//! `mount(format)` brings the partition up through its [`VolumeDriver`].
//! A partition without a usable file system is formatted only when `format`
//! is true; a device failure never is.
//!
//! ## Example
//!
//! ```no_run
//! use nvstore_fs::{MountConfig, OpenMode, Volume};
//!
//! let volume = Volume::host(MountConfig::new().root("/data/fat")).unwrap();
//! volume.mount(true).unwrap();
//! let names = volume.list_files("").unwrap();
//! println!("{names:?}");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod driver;
mod error;
mod volume;

pub use config::{MountConfig, MAX_LABEL_LEN, MAX_ROOT_LEN};
pub use driver::{DriverError, HostDriver, VolumeDriver, FORMAT_MARKER};
pub use error::{FsError, FsResult};
pub use volume::{FileHandle, MountState, OpenMode, Volume};
