//! File-backed record store.
//!
//! Every identifier maps to one file, `<records_dir>/<id>.<extension>`,
//! relative to the volume root. A saved record is one tag byte
//! ([`ValueType::code`]) followed by the value's encoding. Besides the
//! capability contract the store offers raw positional access to those
//! files through [`RecordSet`].

use crate::config::RecordConfig;
use crate::contract::{NvStore, StoreSession};
use crate::error::{StoreError, StoreResult};
use nvstore_fs::{FileHandle, FsError, OpenMode, Volume, VolumeDriver};
use nvstore_kv::{EngineError, TypedValue, ValueType};
use parking_lot::{Mutex, MutexGuard};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Suffix of the file a save writes before renaming it into place.
const STAGING_SUFFIX: &str = "tmp";

/// A store keeping each value in its own file on a [`Volume`].
///
/// The volume is shared: other components may use it for their own files
/// while the store owns its records directory.
#[derive(Debug)]
pub struct RecordStore<D: VolumeDriver = Box<dyn VolumeDriver>> {
    name: String,
    volume: Arc<Volume<D>>,
    records_dir: PathBuf,
    extension: String,
    bracket: Mutex<()>,
}

impl<D: VolumeDriver> RecordStore<D> {
    /// Creates a store named `name` on `volume`.
    ///
    /// The volume's own configuration decides whether `init` may format it.
    pub fn new(name: impl Into<String>, volume: Arc<Volume<D>>, config: &RecordConfig) -> Self {
        Self {
            name: name.into(),
            volume,
            records_dir: config.records_dir.clone(),
            extension: config.extension.clone(),
            bracket: Mutex::new(()),
        }
    }

    /// The underlying volume.
    #[must_use]
    pub fn volume(&self) -> &Arc<Volume<D>> {
        &self.volume
    }

    /// Path of the record file for `id`, relative to the volume root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] unless `id` is a single
    /// normal path component.
    pub fn record_path(&self, id: &str) -> StoreResult<PathBuf> {
        let mut components = Path::new(id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !id.contains(['/', '\\']) => {
                Ok(self.records_dir.join(format!("{id}.{}", self.extension)))
            }
            _ => Err(StoreError::invalid_argument(format!(
                "record identifier {id:?} must be a single path component"
            ))),
        }
    }

    /// Opens the record file for `id` for reading and writing, creating it
    /// if needed.
    ///
    /// Record sets do not take the store's session lock; each transfer
    /// takes the volume lock for its own duration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidHandle`] if the volume is not mounted,
    /// or a volume error if the file cannot be opened.
    pub fn open_record_set(&self, id: &str) -> StoreResult<RecordSet<'_, D>> {
        self.open_set(id, OpenMode::ReadWriteCreate)
    }

    fn open_set(&self, id: &str, mode: OpenMode) -> StoreResult<RecordSet<'_, D>> {
        let path = self.record_path(id)?;
        let file = self
            .volume
            .open(&path, mode)
            .map_err(|e| StoreError::from_fs(id, e))?;
        debug!(id, path = %path.display(), ?mode, "opened record set");
        Ok(RecordSet {
            volume: &self.volume,
            file,
        })
    }

    /// Reads from the record file for `id` at `cursor` (or 0) into `buf`.
    ///
    /// Opens, reads once and closes. The cursor, if given, advances by the
    /// number of bytes read, which is returned. A record that does not
    /// exist reads as 0 bytes and is not created.
    pub fn get_record(
        &self,
        id: &str,
        buf: &mut [u8],
        cursor: Option<&mut u64>,
    ) -> StoreResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut pos = cursor.as_deref().copied().unwrap_or(0);
        let mut set = match self.open_set(id, OpenMode::Read) {
            Ok(set) => set,
            Err(StoreError::NotFound { .. }) => {
                debug!(id, "read of a missing record");
                return Ok(0);
            }
            Err(e) => return Err(e),
        };
        let n = set.read(buf, Some(&mut pos))?;
        set.close()?;
        if let Some(cursor) = cursor {
            *cursor = pos;
        }
        Ok(n)
    }

    /// Writes `data` into the record file for `id` at `cursor` (or 0).
    ///
    /// Opens, writes once and closes. The cursor, if given, advances by the
    /// number of bytes written, which is returned.
    pub fn set_record(
        &self,
        id: &str,
        data: &[u8],
        cursor: Option<&mut u64>,
    ) -> StoreResult<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let mut pos = cursor.as_deref().copied().unwrap_or(0);
        let mut set = self.open_record_set(id)?;
        let n = set.write(data, Some(&mut pos))?;
        set.close()?;
        if let Some(cursor) = cursor {
            *cursor = pos;
        }
        Ok(n)
    }
}

impl<D: VolumeDriver> NvStore for RecordStore<D> {
    type Session<'a> = RecordSession<'a, D> where Self: 'a;

    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self) -> StoreResult<()> {
        let _bracket = self.bracket.lock();
        let format = self.volume.config().format_if_mount_failed;
        self.volume.mount(format)?;
        if !self.records_dir.as_os_str().is_empty() {
            self.volume.make_dir(&self.records_dir)?;
        }
        debug!(name = %self.name, root = %self.volume.root().display(), "record store ready");
        Ok(())
    }

    fn ready(&self) -> bool {
        self.volume.ready()
    }

    fn open(&self) -> StoreResult<RecordSession<'_, D>> {
        let guard = self.bracket.lock();
        if !self.volume.ready() {
            warn!(name = %self.name, "open on an unmounted volume");
            return Err(StoreError::InvalidHandle);
        }
        Ok(RecordSession {
            store: self,
            _guard: guard,
        })
    }
}

/// A session on a [`RecordStore`], holding the store's lock.
#[derive(Debug)]
pub struct RecordSession<'a, D: VolumeDriver> {
    store: &'a RecordStore<D>,
    _guard: MutexGuard<'a, ()>,
}

impl<D: VolumeDriver> RecordSession<'_, D> {
    fn volume(&self) -> StoreResult<&Volume<D>> {
        if self.store.volume.ready() {
            Ok(&self.store.volume)
        } else {
            Err(StoreError::InvalidHandle)
        }
    }
}

impl<D: VolumeDriver> StoreSession for RecordSession<'_, D> {
    fn save(&mut self, id: &str, value: &TypedValue) -> StoreResult<usize> {
        let volume = self.volume()?;
        let path = self.store.record_path(id)?;
        if matches!(value, TypedValue::Blob(b) if b.is_empty()) {
            return Err(StoreError::invalid_argument("blob must not be empty"));
        }
        if matches!(value, TypedValue::String(s) if s.contains('\0')) {
            return Err(StoreError::invalid_argument("string must not contain NUL"));
        }

        let mut bytes = Vec::with_capacity(1 + value.encoded_len());
        bytes.push(value.value_type().code());
        bytes.extend_from_slice(&value.encode());

        let staging = staging_path(&path);
        let write = || -> Result<(), FsError> {
            let mut file = volume.open(&staging, OpenMode::Write)?;
            volume.write(&mut file, &bytes)?;
            volume.flush(&mut file)?;
            volume.close(file)?;
            volume.replace_file(&staging, &path)
        };
        write().map_err(|e| {
            error!(id, error = %e, "record write failed");
            if let Err(cleanup) = volume.erase_file(&staging) {
                debug!(id, error = %cleanup, "no staging file to remove");
            }
            StoreError::from_fs(id, e)
        })?;
        debug!(id, ty = %value.value_type(), len = value.encoded_len(), "wrote record");
        Ok(value.encoded_len())
    }

    fn restore(&mut self, id: &str, ty: ValueType, capacity: usize) -> StoreResult<TypedValue> {
        let volume = self.volume()?;
        let path = self.store.record_path(id)?;

        let size = volume
            .file_size(&path)
            .map_err(|e| StoreError::from_fs(id, e))?;
        let size = usize::try_from(size).map_err(|_| {
            StoreError::invalid_argument(format!(
                "record {id:?} is {size} bytes, more than this host can address"
            ))
        })?;
        let needed = size.saturating_sub(1);
        if ty.is_variable() && needed > capacity {
            return Err(StoreError::Truncated {
                id: id.to_owned(),
                needed,
                capacity,
            });
        }

        let mut bytes = vec![0u8; size];
        let mut file = volume
            .open(&path, OpenMode::Read)
            .map_err(|e| StoreError::from_fs(id, e))?;
        let n = volume.read(&mut file, &mut bytes)?;
        volume.close(file)?;
        bytes.truncate(n);

        let stored = bytes.first().copied().and_then(ValueType::from_code);
        let Some((_, encoded)) = bytes.split_first().filter(|_| stored == Some(ty)) else {
            warn!(id, expected = %ty, ?stored, "record tag does not match");
            return Err(StoreError::TypeMismatch {
                id: id.to_owned(),
                expected: ty,
                actual: stored,
            });
        };
        TypedValue::decode(ty, encoded).map_err(|e| match e {
            EngineError::InvalidLength { .. } | EngineError::TypeMismatch { .. } => {
                error!(id, %ty, error = %e, "record body does not match its tag");
                StoreError::TypeMismatch {
                    id: id.to_owned(),
                    expected: ty,
                    actual: None,
                }
            }
            other => StoreError::Engine(other),
        })
    }

    fn check_key(&mut self, id: &str) -> bool {
        let Ok(volume) = self.volume() else {
            warn!(id, "key check on an unmounted volume");
            return false;
        };
        let Ok(path) = self.store.record_path(id) else {
            return false;
        };
        volume.file_size(&path).is_ok()
    }

    fn remove_key(&mut self, id: &str) -> StoreResult<()> {
        let volume = self.volume()?;
        let path = self.store.record_path(id)?;
        volume
            .erase_file(&path)
            .map_err(|e| StoreError::from_fs(id, e))?;
        debug!(id, "removed record");
        Ok(())
    }

    fn erase(&mut self) -> StoreResult<()> {
        let volume = self.volume()?;
        let dir = &self.store.records_dir;
        let suffix = format!(".{}", self.store.extension);
        let staged = format!("{suffix}.{STAGING_SUFFIX}");
        let names = match volume.list_files(dir) {
            Ok(names) => names,
            Err(FsError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let mut removed = 0usize;
        for name in names
            .iter()
            .filter(|name| name.ends_with(&suffix) || name.ends_with(&staged))
        {
            volume.erase_file(dir.join(name))?;
            removed += 1;
        }
        debug!(name = %self.store.name, removed, "erased records");
        Ok(())
    }
}

impl<D: VolumeDriver> Drop for RecordSession<'_, D> {
    fn drop(&mut self) {
        if !self.store.volume.ready() {
            warn!(name = %self.store.name, "close on an unmounted volume");
        }
    }
}

/// An open record file with an implicit byte cursor.
///
/// Created by [`RecordStore::open_record_set`]; closed by
/// [`close`](Self::close) or on drop.
#[derive(Debug)]
pub struct RecordSet<'a, D: VolumeDriver> {
    volume: &'a Volume<D>,
    file: FileHandle,
}

impl<D: VolumeDriver> RecordSet<'_, D> {
    /// Writes `data`, first seeking to `cursor` if given.
    ///
    /// Returns the number of bytes written and advances the cursor by it.
    /// Empty data returns 0 without touching the file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidHandle`] if the volume was unmounted, or
    /// a volume error.
    pub fn write(&mut self, data: &[u8], cursor: Option<&mut u64>) -> StoreResult<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        if let Some(pos) = cursor.as_deref() {
            self.volume.seek(&mut self.file, *pos).map_err(map_set_error)?;
        }
        let n = self.volume.write(&mut self.file, data).map_err(map_set_error)?;
        advance(cursor, n)?;
        Ok(n)
    }

    /// Reads into `buf`, first seeking to `cursor` if given.
    ///
    /// Returns the number of bytes read, short at end of file, and advances
    /// the cursor by it. An empty buffer returns 0.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidHandle`] if the volume was unmounted, or
    /// a volume error.
    pub fn read(&mut self, buf: &mut [u8], cursor: Option<&mut u64>) -> StoreResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(pos) = cursor.as_deref() {
            self.volume.seek(&mut self.file, *pos).map_err(map_set_error)?;
        }
        let n = self.volume.read(&mut self.file, buf).map_err(map_set_error)?;
        advance(cursor, n)?;
        Ok(n)
    }

    /// Flushes and closes the file.
    pub fn close(self) -> StoreResult<()> {
        self.volume.close(self.file)?;
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

/// Moves a caller's cursor past `n` transferred bytes.
fn advance(cursor: Option<&mut u64>, n: usize) -> StoreResult<()> {
    let Some(pos) = cursor else {
        return Ok(());
    };
    let current = *pos;
    *pos = u64::try_from(n)
        .ok()
        .and_then(|n| current.checked_add(n))
        .ok_or_else(|| StoreError::invalid_argument("record cursor overflows u64"))?;
    Ok(())
}

fn map_set_error(e: FsError) -> StoreError {
    match e {
        FsError::NotMounted => StoreError::InvalidHandle,
        other => StoreError::Fs(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use nvstore_fs::{HostDriver, MountConfig};
    use tempfile::{tempdir, TempDir};

    fn store() -> (TempDir, RecordStore<HostDriver>) {
        let dir = tempdir().unwrap();
        let mount = MountConfig::new()
            .root(dir.path())
            .format_if_mount_failed(true);
        let volume = Arc::new(Volume::host(mount).unwrap());
        let store = RecordStore::new("records", volume, &RecordConfig::new().records_dir("rec"));
        store.init().unwrap();
        (dir, store)
    }

    #[test]
    fn identifiers_map_to_files() {
        let (dir, store) = store();
        assert_eq!(store.record_path("cfg").unwrap(), PathBuf::from("rec/cfg.dat"));
        store.save("cfg", &TypedValue::U16(9)).unwrap();
        assert!(dir.path().join("rec/cfg.dat").is_file());

        for bad in ["", "..", "a/b", "/abs", "."] {
            let err = store.record_path(bad).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidArgument, "{bad:?}");
        }
    }

    #[test]
    fn save_replaces_the_file() {
        let (_dir, store) = store();
        store.save("s", &TypedValue::String("long value".into())).unwrap();
        store.save("s", &TypedValue::String("short".into())).unwrap();
        assert_eq!(
            store.restore("s", ValueType::String, 32).unwrap(),
            TypedValue::String("short".into())
        );
    }

    #[test]
    fn wrong_width_is_type_mismatch() {
        let (_dir, store) = store();
        store.save("n", &TypedValue::U32(42)).unwrap();
        let err = store.restore("n", ValueType::U16, 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
        let err = store.restore("n", ValueType::String, 16).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
        assert_eq!(
            store.restore("n", ValueType::U32, 0).unwrap(),
            TypedValue::U32(42)
        );
    }

    #[test]
    fn same_width_tags_are_not_coerced() {
        let (_dir, store) = store();
        store.save("n", &TypedValue::U32(u32::MAX)).unwrap();
        store.save("s", &TypedValue::String("abc".into())).unwrap();

        for (id, ty, stored) in [
            ("n", ValueType::I32, ValueType::U32),
            ("n", ValueType::Blob, ValueType::U32),
            ("s", ValueType::U32, ValueType::String),
            ("s", ValueType::Blob, ValueType::String),
        ] {
            let err = store.restore(id, ty, 64).unwrap_err();
            assert!(
                matches!(
                    err,
                    StoreError::TypeMismatch { expected, actual: Some(actual), .. }
                        if expected == ty && actual == stored
                ),
                "{id} as {ty}: {err:?}"
            );
        }
        assert_eq!(
            store.restore("n", ValueType::U32, 0).unwrap(),
            TypedValue::U32(u32::MAX)
        );
    }

    #[test]
    fn saved_record_carries_its_tag() {
        let (dir, store) = store();
        assert_eq!(store.save("n", &TypedValue::U16(0x0102)).unwrap(), 2);
        let raw = std::fs::read(dir.path().join("rec/n.dat")).unwrap();
        assert_eq!(raw, vec![ValueType::U16.code(), 0x02, 0x01]);
        assert!(!dir.path().join("rec/n.dat.tmp").exists());
    }

    #[test]
    fn untagged_file_is_type_mismatch() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("rec/raw.dat"), [0u8, 1, 2, 3]).unwrap();
        assert!(matches!(
            store.restore("raw", ValueType::Blob, 16),
            Err(StoreError::TypeMismatch { actual: None, .. })
        ));
    }

    #[test]
    fn capacity_bounds_blobs() {
        let (_dir, store) = store();
        store.save("b", &TypedValue::Blob(vec![7; 10])).unwrap();
        let err = store.restore("b", ValueType::Blob, 9).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Truncated {
                needed: 10,
                capacity: 9,
                ..
            }
        ));
    }

    #[test]
    fn missing_record_is_not_found() {
        let (_dir, store) = store();
        assert_eq!(
            store.restore("nope", ValueType::U8, 0).unwrap_err().code(),
            ErrorCode::NotFound
        );
        assert_eq!(store.remove_key("nope").unwrap_err().code(), ErrorCode::NotFound);
        assert!(!store.check_key("nope"));
    }

    #[test]
    fn erase_removes_only_records() {
        let (dir, store) = store();
        store.save("a", &TypedValue::U8(1)).unwrap();
        store.save("b", &TypedValue::U8(2)).unwrap();
        std::fs::write(dir.path().join("rec/notes.txt"), b"keep").unwrap();

        store.erase().unwrap();
        assert!(!store.check_key("a"));
        assert!(!store.check_key("b"));
        assert!(dir.path().join("rec/notes.txt").exists());
    }

    #[test]
    fn record_set_cursor_advances() {
        let (_dir, store) = store();
        let mut set = store.open_record_set("log").unwrap();
        let mut cursor = 0u64;
        assert_eq!(set.write(b"hello ", Some(&mut cursor)).unwrap(), 6);
        assert_eq!(set.write(b"world", Some(&mut cursor)).unwrap(), 5);
        assert_eq!(cursor, 11);
        assert_eq!(set.write(b"", Some(&mut cursor)).unwrap(), 0);
        assert_eq!(cursor, 11);

        let mut buf = [0u8; 5];
        let mut at = 6u64;
        assert_eq!(set.read(&mut buf, Some(&mut at)).unwrap(), 5);
        assert_eq!(&buf, b"world");
        assert_eq!(at, 11);
        assert_eq!(set.read(&mut buf, Some(&mut at)).unwrap(), 0);
        set.close().unwrap();
    }

    #[test]
    fn record_set_without_cursor_continues() {
        let (_dir, store) = store();
        let mut set = store.open_record_set("log").unwrap();
        set.write(b"ab", None).unwrap();
        set.write(b"cd", None).unwrap();
        set.close().unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(store.get_record("log", &mut buf, None).unwrap(), 4);
        assert_eq!(&buf[..4], b"abcd");
    }

    #[test]
    fn one_shot_records_move_the_cursor() {
        let (_dir, store) = store();
        let mut cursor = 0u64;
        store.set_record("r", b"0123", Some(&mut cursor)).unwrap();
        store.set_record("r", b"4567", Some(&mut cursor)).unwrap();
        assert_eq!(cursor, 8);

        let mut buf = [0u8; 3];
        let mut at = 2u64;
        assert_eq!(store.get_record("r", &mut buf, Some(&mut at)).unwrap(), 3);
        assert_eq!(&buf, b"234");
        assert_eq!(at, 5);
    }

    #[test]
    fn reading_a_missing_record_creates_nothing() {
        let (dir, store) = store();
        let mut buf = [0u8; 4];
        let mut at = 3u64;
        assert_eq!(store.get_record("ghost", &mut buf, Some(&mut at)).unwrap(), 0);
        assert_eq!(at, 3);
        assert!(!dir.path().join("rec/ghost.dat").exists());
        assert!(!store.check_key("ghost"));
        assert_eq!(
            store.restore("ghost", ValueType::Blob, 16).unwrap_err().code(),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn erase_removes_leftover_staging_files() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("rec/cut.dat.tmp"), b"\x05half").unwrap();
        store.erase().unwrap();
        assert!(!dir.path().join("rec/cut.dat.tmp").exists());
    }

    #[test]
    fn cursor_overflow_is_invalid_argument() {
        let mut pos = u64::MAX - 1;
        let err = advance(Some(&mut pos), 2).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(pos, u64::MAX - 1);

        advance(Some(&mut pos), 1).unwrap();
        assert_eq!(pos, u64::MAX);
        advance(None, usize::MAX).unwrap();
    }

    #[test]
    fn unmounted_volume_is_invalid_handle() {
        let (_dir, store) = store();
        store.volume().umount().unwrap();
        assert!(!store.ready());
        assert!(matches!(store.open(), Err(StoreError::InvalidHandle)));
        assert!(matches!(
            store.open_record_set("x"),
            Err(StoreError::InvalidHandle)
        ));
    }
}
