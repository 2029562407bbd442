//! Mutex-guarded file system access on a mountable volume.

use crate::config::MountConfig;
use crate::driver::{DriverError, HostDriver, VolumeDriver};
use crate::error::{FsError, FsResult};
use parking_lot::{Mutex, MutexGuard};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Mount state of a [`Volume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    /// Not mounted.
    Unmounted,
    /// A mount attempt is in progress.
    Mounting,
    /// A format is in progress after a failed mount.
    Formatting,
    /// Mounted and usable.
    Ready,
    /// The last mount attempt failed.
    Failed,
}

/// How a file is opened. Mirrors the C `fopen` modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `r`: read an existing file.
    Read,
    /// `r+`: read and write an existing file.
    ReadWrite,
    /// `r+`, creating the file if missing. Used by record sets.
    ReadWriteCreate,
    /// `w`: create or truncate, write only.
    Write,
    /// `a+`: read anywhere, append writes, create if missing.
    Append,
}

impl OpenMode {
    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::ReadWrite => options.read(true).write(true),
            OpenMode::ReadWriteCreate => options.read(true).write(true).create(true).truncate(false),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.read(true).append(true).create(true),
        };
        options
    }
}

/// Releases an open-file slot when dropped.
#[derive(Debug)]
struct OpenSlot(Arc<AtomicUsize>);

impl Drop for OpenSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A file opened through a [`Volume`].
///
/// Dropping the handle closes the file and frees its slot; [`Volume::close`]
/// additionally flushes it under the volume lock.
#[derive(Debug)]
pub struct FileHandle {
    file: File,
    path: PathBuf,
    _slot: OpenSlot,
}

impl FileHandle {
    /// Path of the file, relative to the volume root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug)]
struct Inner<D> {
    driver: D,
    state: MountState,
}

/// A mountable volume with serialized file access.
///
/// Every primitive takes the volume lock for the duration of that one call.
/// All paths are relative to the mount root.
///
/// # Thread Safety
///
/// `Volume` is `Send + Sync`; concurrent callers are serialized by the
/// internal lock.
///
/// # Example
///
/// ```no_run
/// use nvstore_fs::{MountConfig, OpenMode, Volume};
///
/// let config = MountConfig::new().root("/data/fat").format_if_mount_failed(true);
/// let volume = Volume::host(config).unwrap();
/// volume.mount(true).unwrap();
///
/// let mut file = volume.open("log.txt", OpenMode::Append).unwrap();
/// volume.write(&mut file, b"boot\n").unwrap();
/// volume.close(file).unwrap();
/// ```
#[derive(Debug)]
pub struct Volume<D: VolumeDriver = HostDriver> {
    config: MountConfig,
    inner: Mutex<Inner<D>>,
    ready: AtomicBool,
    open_files: Arc<AtomicUsize>,
}

impl Volume<HostDriver> {
    /// Creates an unmounted volume on a host directory.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidConfig`] if the parameters are out of bounds.
    pub fn host(config: MountConfig) -> FsResult<Self> {
        Self::new(config, HostDriver::new())
    }
}

impl<D: VolumeDriver> Volume<D> {
    /// Creates an unmounted volume.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidConfig`] if the parameters are out of bounds.
    pub fn new(config: MountConfig, driver: D) -> FsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            inner: Mutex::new(Inner {
                driver,
                state: MountState::Unmounted,
            }),
            ready: AtomicBool::new(false),
            open_files: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The mount parameters.
    #[must_use]
    pub fn config(&self) -> &MountConfig {
        &self.config
    }

    /// The mount root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Whether the volume is mounted. Takes no lock.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Current mount state.
    #[must_use]
    pub fn state(&self) -> MountState {
        self.inner.lock().state
    }

    /// Number of files currently open.
    #[must_use]
    pub fn open_files(&self) -> usize {
        self.open_files.load(Ordering::Acquire)
    }

    /// Mounts the volume.
    ///
    /// If the partition has no usable file system and `format` is true, it
    /// is formatted and mounted again, once. A device failure is never
    /// answered with a format. Mounting a ready volume is a no-op.
    ///
    /// # Errors
    ///
    /// - [`FsError::MountFailed`] if there is no file system and `format` is
    ///   false, or formatting did not help
    /// - [`FsError::DeviceFault`] if the driver reports a device failure
    pub fn mount(&self, format: bool) -> FsResult<()> {
        let mut inner = self.inner.lock();
        if inner.state == MountState::Ready {
            return Ok(());
        }

        let label = self.config.label.as_str();
        let root = self.config.root.as_path();
        inner.state = MountState::Mounting;
        debug!(label, root = %root.display(), "mounting volume");

        let result = match inner.driver.mount(label, root) {
            Err(DriverError::NoFilesystem { reason }) if format => {
                warn!(label, %reason, "no file system on volume, formatting");
                inner.state = MountState::Formatting;
                inner
                    .driver
                    .format(label, root)
                    .and_then(|()| inner.driver.mount(label, root))
            }
            other => other,
        };

        match result {
            Ok(()) => {
                inner.state = MountState::Ready;
                self.ready.store(true, Ordering::Release);
                debug!(label, "volume mounted");
                Ok(())
            }
            Err(DriverError::NoFilesystem { reason }) => {
                inner.state = MountState::Failed;
                error!(label, %reason, "failed to mount volume");
                Err(FsError::MountFailed {
                    label: label.to_owned(),
                    reason,
                })
            }
            Err(DriverError::Device(source)) => {
                inner.state = MountState::Failed;
                error!(label, error = %source, "device fault while mounting volume");
                Err(FsError::DeviceFault {
                    label: label.to_owned(),
                    source,
                })
            }
        }
    }

    /// Unmounts the volume.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::NotMounted`] if the volume is not mounted, or
    /// [`FsError::DeviceFault`] if the driver fails.
    pub fn umount(&self) -> FsResult<()> {
        let mut inner = self.lock_mounted()?;
        let open = self.open_files();
        if open > 0 {
            warn!(label = %self.config.label, open, "unmounting with files still open");
        }
        self.ready.store(false, Ordering::Release);
        inner.state = MountState::Unmounted;
        inner
            .driver
            .unmount(&self.config.root)
            .map_err(|e| self.driver_error(e))?;
        debug!(label = %self.config.label, "volume unmounted");
        Ok(())
    }

    /// Opens a file.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::TooManyOpenFiles`] when the open-file limit is
    /// reached, [`FsError::NotFound`] if a mode that needs an existing file
    /// finds none, or an I/O error.
    pub fn open(&self, path: impl AsRef<Path>, mode: OpenMode) -> FsResult<FileHandle> {
        let path = path.as_ref();
        let _inner = self.lock_mounted()?;
        let full = self.resolve(path)?;
        let slot = self.acquire_slot()?;
        let file = mode.options().open(&full).map_err(|e| not_found_or(e, path))?;
        Ok(FileHandle {
            file,
            path: path.to_path_buf(),
            _slot: slot,
        })
    }

    /// Flushes and closes a file.
    pub fn close(&self, mut handle: FileHandle) -> FsResult<()> {
        let _inner = self.inner.lock();
        handle.file.flush()?;
        Ok(())
    }

    /// Reads until `buf` is full or the end of the file.
    ///
    /// Returns the number of bytes read, which is short only at end of file.
    pub fn read(&self, handle: &mut FileHandle, buf: &mut [u8]) -> FsResult<usize> {
        let _inner = self.lock_mounted()?;
        read_full(&mut handle.file, buf)
    }

    /// Writes all of `data`, returning the number of bytes written.
    pub fn write(&self, handle: &mut FileHandle, data: &[u8]) -> FsResult<usize> {
        let _inner = self.lock_mounted()?;
        handle.file.write_all(data)?;
        Ok(data.len())
    }

    /// Moves the file position to `offset` bytes from the start.
    pub fn seek(&self, handle: &mut FileHandle, offset: u64) -> FsResult<u64> {
        let _inner = self.lock_mounted()?;
        Ok(handle.file.seek(SeekFrom::Start(offset))?)
    }

    /// Flushes buffered writes of a file through to the device.
    pub fn flush(&self, handle: &mut FileHandle) -> FsResult<()> {
        let _inner = self.lock_mounted()?;
        handle.file.flush()?;
        handle.file.sync_data()?;
        Ok(())
    }

    /// Reads one line into `buf` and NUL-terminates it.
    ///
    /// Bytes are accumulated up to and including a newline, or until
    /// `buf.len() - 1` bytes are read, so the terminator always fits.
    /// Returns the line length without the terminator; 0 means end of file.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidArgument`] if `buf` is empty.
    pub fn read_line(&self, handle: &mut FileHandle, buf: &mut [u8]) -> FsResult<usize> {
        let Some(max_len) = buf.len().checked_sub(1) else {
            return Err(FsError::invalid_argument("line buffer must hold the terminator"));
        };
        let _inner = self.lock_mounted()?;

        let mut len = 0;
        let mut byte = [0u8; 1];
        while len < max_len {
            if handle.file.read(&mut byte)? == 0 {
                break;
            }
            buf[len] = byte[0];
            len += 1;
            if byte[0] == b'\n' {
                break;
            }
        }
        buf[len] = 0;
        Ok(len)
    }

    /// Counts the lines of a file. A trailing line without a newline counts.
    pub fn line_count(&self, path: impl AsRef<Path>) -> FsResult<usize> {
        let path = path.as_ref();
        let _inner = self.lock_mounted()?;
        let full = self.resolve(path)?;
        let file = File::open(&full).map_err(|e| not_found_or(e, path))?;

        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        let mut count = 0;
        while reader.read_until(b'\n', &mut line)? > 0 {
            count += 1;
            line.clear();
        }
        Ok(count)
    }

    /// Lists the regular files of a directory, in enumeration order.
    ///
    /// Directories, special files and driver-reserved files are skipped.
    pub fn list_files(&self, dir: impl AsRef<Path>) -> FsResult<Vec<String>> {
        let dir = dir.as_ref();
        let inner = self.lock_mounted()?;
        let full = self.resolve(dir)?;
        let at_root = full == self.config.root;

        let mut names = Vec::new();
        for entry in fs::read_dir(&full).map_err(|e| not_found_or(e, dir))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if at_root && inner.driver.is_reserved(&name) {
                continue;
            }
            names.push(name);
        }
        Ok(names)
    }

    /// Copies `src` to `dst`, returning the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::SourceNotFound`] before touching anything if `src`
    /// does not exist.
    pub fn copy_file(&self, src: impl AsRef<Path>, dst: impl AsRef<Path>) -> FsResult<u64> {
        let (src, dst) = (src.as_ref(), dst.as_ref());
        let _inner = self.lock_mounted()?;
        let (from, to) = (self.resolve(src)?, self.resolve(dst)?);
        if !from.is_file() {
            return Err(FsError::SourceNotFound {
                path: src.to_path_buf(),
            });
        }
        Ok(fs::copy(from, to)?)
    }

    /// Renames `src` to `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::SourceNotFound`] or [`FsError::DestinationExists`]
    /// before touching anything.
    pub fn rename_file(&self, src: impl AsRef<Path>, dst: impl AsRef<Path>) -> FsResult<()> {
        let (src, dst) = (src.as_ref(), dst.as_ref());
        let _inner = self.lock_mounted()?;
        let (from, to) = (self.resolve(src)?, self.resolve(dst)?);
        if !from.exists() {
            return Err(FsError::SourceNotFound {
                path: src.to_path_buf(),
            });
        }
        if to.exists() {
            return Err(FsError::DestinationExists {
                path: dst.to_path_buf(),
            });
        }
        fs::rename(from, to)?;
        Ok(())
    }

    /// Renames `src` over `dst`, replacing `dst` in one step if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::SourceNotFound`] if `src` does not exist.
    pub fn replace_file(&self, src: impl AsRef<Path>, dst: impl AsRef<Path>) -> FsResult<()> {
        let (src, dst) = (src.as_ref(), dst.as_ref());
        let _inner = self.lock_mounted()?;
        let (from, to) = (self.resolve(src)?, self.resolve(dst)?);
        if !from.is_file() {
            return Err(FsError::SourceNotFound {
                path: src.to_path_buf(),
            });
        }
        fs::rename(from, to)?;
        Ok(())
    }

    /// Deletes a file.
    pub fn erase_file(&self, path: impl AsRef<Path>) -> FsResult<()> {
        let path = path.as_ref();
        let _inner = self.lock_mounted()?;
        let full = self.resolve(path)?;
        fs::remove_file(full).map_err(|e| not_found_or(e, path))
    }

    /// Creates a directory and any missing parents.
    pub fn make_dir(&self, path: impl AsRef<Path>) -> FsResult<()> {
        let _inner = self.lock_mounted()?;
        let full = self.resolve(path.as_ref())?;
        fs::create_dir_all(full)?;
        Ok(())
    }

    /// Whether a file or directory exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> FsResult<bool> {
        let _inner = self.lock_mounted()?;
        Ok(self.resolve(path.as_ref())?.exists())
    }

    /// Size of a file in bytes.
    pub fn file_size(&self, path: impl AsRef<Path>) -> FsResult<u64> {
        let path = path.as_ref();
        let _inner = self.lock_mounted()?;
        let full = self.resolve(path)?;
        let meta = fs::metadata(full).map_err(|e| not_found_or(e, path))?;
        Ok(meta.len())
    }

    fn lock_mounted(&self) -> FsResult<MutexGuard<'_, Inner<D>>> {
        let inner = self.inner.lock();
        if inner.state != MountState::Ready {
            return Err(FsError::NotMounted);
        }
        Ok(inner)
    }

    /// Joins a volume-relative path onto the root, refusing escapes.
    fn resolve(&self, path: &Path) -> FsResult<PathBuf> {
        let mut full = self.config.root.clone();
        for component in path.components() {
            match component {
                Component::Normal(part) => full.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(FsError::InvalidPath {
                        path: path.to_path_buf(),
                    })
                }
            }
        }
        Ok(full)
    }

    fn acquire_slot(&self) -> FsResult<OpenSlot> {
        let max = self.config.max_files;
        self.open_files
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .map_err(|_| FsError::TooManyOpenFiles { max })?;
        Ok(OpenSlot(Arc::clone(&self.open_files)))
    }

    fn driver_error(&self, e: DriverError) -> FsError {
        match e {
            DriverError::NoFilesystem { reason } => FsError::MountFailed {
                label: self.config.label.clone(),
                reason,
            },
            DriverError::Device(source) => FsError::DeviceFault {
                label: self.config.label.clone(),
                source,
            },
        }
    }
}

fn read_full(file: &mut File, buf: &mut [u8]) -> FsResult<usize> {
    let mut total = 0;
    while total < buf.len() {
        match file.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(total)
}

fn not_found_or(e: io::Error, path: &Path) -> FsError {
    if e.kind() == ErrorKind::NotFound {
        FsError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        FsError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn mounted() -> (TempDir, Volume) {
        let dir = tempdir().unwrap();
        let volume = Volume::host(MountConfig::new().root(dir.path()).max_files(2)).unwrap();
        volume.mount(true).unwrap();
        (dir, volume)
    }

    fn write_file(volume: &Volume, path: &str, data: &[u8]) {
        let mut file = volume.open(path, OpenMode::Write).unwrap();
        volume.write(&mut file, data).unwrap();
        volume.close(file).unwrap();
    }

    #[test]
    fn mount_without_format_fails_on_blank_volume() {
        let dir = tempdir().unwrap();
        let volume = Volume::host(MountConfig::new().root(dir.path())).unwrap();

        assert!(matches!(volume.mount(false), Err(FsError::MountFailed { .. })));
        assert!(!volume.ready());
        assert_eq!(volume.state(), MountState::Failed);

        volume.mount(true).unwrap();
        assert!(volume.ready());
        assert_eq!(volume.state(), MountState::Ready);
    }

    #[test]
    fn device_fault_is_not_formatted() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("missing-partition");
        let volume = Volume::host(MountConfig::new().root(&root)).unwrap();

        assert!(matches!(volume.mount(true), Err(FsError::DeviceFault { .. })));
        assert!(!volume.ready());
        assert!(!root.exists());
    }

    #[test]
    fn operations_need_a_mounted_volume() {
        let (_dir, volume) = mounted();
        volume.umount().unwrap();
        assert!(!volume.ready());
        assert!(matches!(
            volume.open("a.txt", OpenMode::Write),
            Err(FsError::NotMounted)
        ));
        assert!(matches!(volume.umount(), Err(FsError::NotMounted)));
    }

    #[test]
    fn remount_keeps_files() {
        let (_dir, volume) = mounted();
        write_file(&volume, "keep.txt", b"kept");
        volume.umount().unwrap();
        volume.mount(false).unwrap();
        assert_eq!(volume.file_size("keep.txt").unwrap(), 4);
    }

    #[test]
    fn write_seek_read() {
        let (_dir, volume) = mounted();
        let mut file = volume.open("data.bin", OpenMode::ReadWriteCreate).unwrap();
        assert_eq!(volume.write(&mut file, b"hello world").unwrap(), 11);
        volume.seek(&mut file, 6).unwrap();

        let mut buf = [0u8; 16];
        let n = volume.read(&mut file, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"world");
        volume.close(file).unwrap();
    }

    #[test]
    fn open_missing_file_for_read_is_not_found() {
        let (_dir, volume) = mounted();
        assert!(matches!(
            volume.open("nope.txt", OpenMode::Read),
            Err(FsError::NotFound { .. })
        ));
        assert_eq!(volume.open_files(), 0);
    }

    #[test]
    fn open_file_limit() {
        let (_dir, volume) = mounted();
        let a = volume.open("a", OpenMode::Write).unwrap();
        let _b = volume.open("b", OpenMode::Write).unwrap();
        assert!(matches!(
            volume.open("c", OpenMode::Write),
            Err(FsError::TooManyOpenFiles { max: 2 })
        ));

        volume.close(a).unwrap();
        assert_eq!(volume.open_files(), 1);
        assert!(volume.open("c", OpenMode::Write).is_ok());
    }

    #[test]
    fn paths_cannot_escape_the_root() {
        let (_dir, volume) = mounted();
        assert!(matches!(
            volume.open("../outside", OpenMode::Write),
            Err(FsError::InvalidPath { .. })
        ));
        assert!(matches!(
            volume.open("/etc/passwd", OpenMode::Read),
            Err(FsError::InvalidPath { .. })
        ));
    }

    #[test]
    fn read_line_stops_at_newline_and_terminates() {
        let (_dir, volume) = mounted();
        write_file(&volume, "log.txt", b"first\nsecond line\nx");

        let mut file = volume.open("log.txt", OpenMode::Read).unwrap();
        let mut buf = [0xffu8; 8];

        assert_eq!(volume.read_line(&mut file, &mut buf).unwrap(), 6);
        assert_eq!(&buf[..7], b"first\n\0");

        // Longer than the buffer: split at buf.len() - 1 bytes.
        assert_eq!(volume.read_line(&mut file, &mut buf).unwrap(), 7);
        assert_eq!(&buf, b"second \0");
        assert_eq!(volume.read_line(&mut file, &mut buf).unwrap(), 5);
        assert_eq!(&buf[..6], b"line\n\0");

        assert_eq!(volume.read_line(&mut file, &mut buf).unwrap(), 1);
        assert_eq!(&buf[..2], b"x\0");
        assert_eq!(volume.read_line(&mut file, &mut buf).unwrap(), 0);
        assert_eq!(buf[0], 0);

        let mut empty: [u8; 0] = [];
        assert!(matches!(
            volume.read_line(&mut file, &mut empty),
            Err(FsError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn line_count_counts_unterminated_tail() {
        let (_dir, volume) = mounted();
        write_file(&volume, "a.txt", b"1\n2\n3");
        write_file(&volume, "b.txt", b"1\n2\n");
        write_file(&volume, "c.txt", b"");
        assert_eq!(volume.line_count("a.txt").unwrap(), 3);
        assert_eq!(volume.line_count("b.txt").unwrap(), 2);
        assert_eq!(volume.line_count("c.txt").unwrap(), 0);
    }

    #[test]
    fn list_files_skips_directories_and_marker() {
        let (_dir, volume) = mounted();
        write_file(&volume, "one.dat", b"1");
        write_file(&volume, "two.dat", b"2");
        volume.make_dir("sub").unwrap();

        let mut names = volume.list_files("").unwrap();
        names.sort();
        assert_eq!(names, vec!["one.dat".to_owned(), "two.dat".to_owned()]);
    }

    #[test]
    fn copy_checks_source_first() {
        let (_dir, volume) = mounted();
        assert!(matches!(
            volume.copy_file("absent", "dst"),
            Err(FsError::SourceNotFound { .. })
        ));
        assert!(!volume.exists("dst").unwrap());

        write_file(&volume, "src", b"abc");
        assert_eq!(volume.copy_file("src", "dst").unwrap(), 3);
        assert_eq!(volume.file_size("dst").unwrap(), 3);
        assert!(volume.exists("src").unwrap());
    }

    #[test]
    fn rename_checks_source_and_destination() {
        let (_dir, volume) = mounted();
        write_file(&volume, "a", b"a");
        write_file(&volume, "b", b"b");

        assert!(matches!(
            volume.rename_file("missing", "c"),
            Err(FsError::SourceNotFound { .. })
        ));
        assert!(matches!(
            volume.rename_file("a", "b"),
            Err(FsError::DestinationExists { .. })
        ));

        volume.rename_file("a", "c").unwrap();
        assert!(!volume.exists("a").unwrap());
        assert!(volume.exists("c").unwrap());
    }

    #[test]
    fn replace_overwrites_destination() {
        let (_dir, volume) = mounted();
        write_file(&volume, "new", b"fresh");
        write_file(&volume, "old", b"stale data");

        volume.replace_file("new", "old").unwrap();
        assert!(!volume.exists("new").unwrap());
        assert_eq!(volume.file_size("old").unwrap(), 5);
        assert!(matches!(
            volume.replace_file("new", "old"),
            Err(FsError::SourceNotFound { .. })
        ));
    }

    #[test]
    fn erase_and_make_dir() {
        let (_dir, volume) = mounted();
        volume.make_dir("logs/2026").unwrap();
        write_file(&volume, "logs/2026/day.txt", b"x");
        volume.erase_file("logs/2026/day.txt").unwrap();
        assert!(matches!(
            volume.erase_file("logs/2026/day.txt"),
            Err(FsError::NotFound { .. })
        ));
        assert!(volume.list_files("logs/2026").unwrap().is_empty());
    }
}
