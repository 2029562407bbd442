//! File-backed key-value engine for host builds.

use crate::engine::{KvEngine, NamespaceHandle};
use crate::error::{EngineError, EngineResult};
use crate::partition::{check_name, Entry, Image, Partition};
use crate::value::{TypedValue, ValueType};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of partition image files.
const IMAGE_EXTENSION: &str = "nvs";

/// Extension of the image being written by a commit.
const STAGING_EXTENSION: &str = "nvs.tmp";

/// Extension of the file holding a partition's advisory lock.
const LOCK_EXTENSION: &str = "nvs.lock";

/// Length of the SHA-256 digest that prefixes every image.
const DIGEST_LEN: usize = 32;

#[derive(Debug)]
struct OpenPartition {
    _lock: File,
    data: Partition,
}

/// A key-value engine that keeps each partition in a file.
///
/// The image is `sha256(payload) || payload`, where the payload is the CBOR
/// encoding of the committed namespaces. An image whose digest or payload
/// does not check out is reported as [`EngineError::NoFreePages`], which is
/// how the flash engine signals a partition that must be erased.
///
/// A commit writes the new image next to the old one and renames it into
/// place, so an interrupted commit leaves the previous image intact.
///
/// Each initialised partition holds an exclusive advisory lock on a
/// `.nvs.lock` file so two processes cannot write the same partition.
#[derive(Debug)]
pub struct FileEngine {
    dir: PathBuf,
    partitions: HashMap<String, OpenPartition>,
}

impl FileEngine {
    /// Creates an engine storing partition images under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` cannot be created.
    pub fn open(dir: &Path) -> EngineResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            partitions: HashMap::new(),
        })
    }

    /// Path of the image file for `partition`.
    #[must_use]
    pub fn image_path(&self, partition: &str) -> PathBuf {
        self.dir.join(format!("{partition}.{IMAGE_EXTENSION}"))
    }

    fn staging_path(&self, partition: &str) -> PathBuf {
        self.dir.join(format!("{partition}.{STAGING_EXTENSION}"))
    }

    fn lock_path(&self, partition: &str) -> PathBuf {
        self.dir.join(format!("{partition}.{LOCK_EXTENSION}"))
    }

    fn partition(&mut self, handle: &NamespaceHandle) -> EngineResult<&mut OpenPartition> {
        self.partitions
            .get_mut(handle.partition())
            .ok_or(EngineError::InvalidHandle)
    }

    /// Writes `image` to the staging file, syncs it and renames it over the
    /// partition image.
    fn write_image(&self, partition: &str, image: &Image) -> EngineResult<()> {
        let mut payload = Vec::new();
        ciborium::into_writer(image, &mut payload)
            .map_err(|e| EngineError::Codec(e.to_string()))?;
        let digest = Sha256::digest(&payload);

        let staging = self.staging_path(partition);
        let mut file = File::create(&staging)?;
        file.write_all(&digest)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&staging, self.image_path(partition))?;
        debug!(partition, len = DIGEST_LEN + payload.len(), "partition image written");
        Ok(())
    }
}

fn read_image(path: &Path, partition: &str) -> EngineResult<Image> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Image::new()),
        Err(e) => return Err(e.into()),
    };
    if raw.is_empty() {
        return Ok(Image::new());
    }

    let corrupted = || EngineError::NoFreePages {
        partition: partition.to_owned(),
    };
    if raw.len() < DIGEST_LEN {
        return Err(corrupted());
    }
    let (digest, payload) = raw.split_at(DIGEST_LEN);
    if Sha256::digest(payload).as_slice() != digest {
        return Err(corrupted());
    }
    ciborium::from_reader(payload).map_err(|_| corrupted())
}

fn remove_if_present(path: &Path) -> EngineResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl KvEngine for FileEngine {
    fn init(&mut self, partition: &str) -> EngineResult<()> {
        if self.partitions.contains_key(partition) {
            return Ok(());
        }

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path(partition))?;
        if lock.try_lock_exclusive().is_err() {
            return Err(EngineError::Locked {
                partition: partition.to_owned(),
            });
        }

        let path = self.image_path(partition);
        let image = read_image(&path, partition)?;
        debug!(partition, path = %path.display(), namespaces = image.len(), "partition loaded");
        self.partitions.insert(
            partition.to_owned(),
            OpenPartition {
                _lock: lock,
                data: Partition::from_image(image),
            },
        );
        Ok(())
    }

    fn erase_partition(&mut self, partition: &str) -> EngineResult<()> {
        // Dropping the open partition releases its lock.
        self.partitions.remove(partition);
        remove_if_present(&self.image_path(partition))?;
        remove_if_present(&self.staging_path(partition))
    }

    fn open(&mut self, partition: &str, namespace: &str) -> EngineResult<NamespaceHandle> {
        check_name("namespace", namespace)?;
        if !self.partitions.contains_key(partition) {
            return Err(EngineError::NotInitialized {
                partition: partition.to_owned(),
            });
        }
        Ok(NamespaceHandle::new(partition, namespace))
    }

    fn close(&mut self, handle: NamespaceHandle) {
        if let Some(open) = self.partitions.get_mut(handle.partition()) {
            open.data.discard(handle.namespace());
        }
    }

    fn set(
        &mut self,
        handle: &NamespaceHandle,
        key: &str,
        value: &TypedValue,
    ) -> EngineResult<()> {
        let open = self.partition(handle)?;
        open.data
            .set(handle.namespace(), key, Entry::from_value(value))
    }

    fn get(
        &mut self,
        handle: &NamespaceHandle,
        key: &str,
        ty: ValueType,
    ) -> EngineResult<TypedValue> {
        let open = self.partition(handle)?;
        open.data
            .get(handle.namespace(), key)
            .ok_or_else(|| EngineError::not_found(key))?
            .to_value(ty)
    }

    fn contains(&self, handle: &NamespaceHandle, key: &str) -> EngineResult<bool> {
        let open = self
            .partitions
            .get(handle.partition())
            .ok_or(EngineError::InvalidHandle)?;
        Ok(open.data.get(handle.namespace(), key).is_some())
    }

    fn erase_key(&mut self, handle: &NamespaceHandle, key: &str) -> EngineResult<()> {
        let open = self.partition(handle)?;
        open.data.remove(handle.namespace(), key)
    }

    fn erase_all(&mut self, handle: &NamespaceHandle) -> EngineResult<()> {
        let open = self.partition(handle)?;
        open.data.clear(handle.namespace());
        Ok(())
    }

    fn commit(&mut self, handle: &NamespaceHandle) -> EngineResult<()> {
        let Some(next) = self.partition(handle)?.data.staged_image(handle.namespace()) else {
            return Ok(());
        };
        self.write_image(handle.partition(), &next)?;
        self.partition(handle)?.data.install(handle.namespace(), next);
        Ok(())
    }

    fn discard(&mut self, handle: &NamespaceHandle) {
        if let Some(open) = self.partitions.get_mut(handle.partition()) {
            open.data.discard(handle.namespace());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_commit_survives_reopen() {
        let dir = tempdir().unwrap();

        {
            let mut engine = FileEngine::open(dir.path()).unwrap();
            engine.init("nvs").unwrap();
            let ns = engine.open("nvs", "app").unwrap();
            engine.set(&ns, "serial", &TypedValue::Blob(vec![1, 2, 3])).unwrap();
            engine.set(&ns, "boots", &TypedValue::U32(9)).unwrap();
            engine.commit(&ns).unwrap();
            engine.close(ns);
        }

        let mut engine = FileEngine::open(dir.path()).unwrap();
        engine.init("nvs").unwrap();
        let ns = engine.open("nvs", "app").unwrap();
        assert_eq!(
            engine.get(&ns, "serial", ValueType::Blob).unwrap(),
            TypedValue::Blob(vec![1, 2, 3])
        );
        assert_eq!(
            engine.get(&ns, "boots", ValueType::U32).unwrap(),
            TypedValue::U32(9)
        );
    }

    #[test]
    fn file_uncommitted_writes_are_lost() {
        let dir = tempdir().unwrap();

        {
            let mut engine = FileEngine::open(dir.path()).unwrap();
            engine.init("nvs").unwrap();
            let ns = engine.open("nvs", "app").unwrap();
            engine.set(&ns, "k", &TypedValue::U8(1)).unwrap();
        }

        let mut engine = FileEngine::open(dir.path()).unwrap();
        engine.init("nvs").unwrap();
        let ns = engine.open("nvs", "app").unwrap();
        assert!(!engine.contains(&ns, "k").unwrap());
    }

    #[test]
    fn file_corrupt_image_reports_no_free_pages() {
        let dir = tempdir().unwrap();
        let mut engine = FileEngine::open(dir.path()).unwrap();
        fs::write(engine.image_path("nvs"), b"definitely not an image, but long enough").unwrap();

        assert!(matches!(
            engine.init("nvs"),
            Err(EngineError::NoFreePages { .. })
        ));

        engine.erase_partition("nvs").unwrap();
        engine.init("nvs").unwrap();
        let ns = engine.open("nvs", "app").unwrap();
        assert!(!engine.contains(&ns, "anything").unwrap());
    }

    #[test]
    fn file_failed_commit_keeps_previous_image() {
        let dir = tempdir().unwrap();
        let mut engine = FileEngine::open(dir.path()).unwrap();
        engine.init("nvs").unwrap();
        let ns = engine.open("nvs", "app").unwrap();
        engine.set(&ns, "a", &TypedValue::U8(1)).unwrap();
        engine.commit(&ns).unwrap();
        let before = fs::read(engine.image_path("nvs")).unwrap();

        // A directory in the staging file's place makes the write fail.
        fs::create_dir(dir.path().join("nvs.nvs.tmp")).unwrap();
        engine.set(&ns, "b", &TypedValue::U8(2)).unwrap();
        assert!(matches!(engine.commit(&ns), Err(EngineError::Io(_))));
        assert_eq!(fs::read(engine.image_path("nvs")).unwrap(), before);

        engine.discard(&ns);
        assert!(!engine.contains(&ns, "b").unwrap());
        engine.close(ns);
        drop(engine);

        fs::remove_dir(dir.path().join("nvs.nvs.tmp")).unwrap();
        let mut engine = FileEngine::open(dir.path()).unwrap();
        engine.init("nvs").unwrap();
        let ns = engine.open("nvs", "app").unwrap();
        assert_eq!(engine.get(&ns, "a", ValueType::U8).unwrap(), TypedValue::U8(1));
        assert!(!engine.contains(&ns, "b").unwrap());
    }

    #[test]
    fn file_torn_staging_file_is_ignored() {
        let dir = tempdir().unwrap();
        {
            let mut engine = FileEngine::open(dir.path()).unwrap();
            engine.init("nvs").unwrap();
            let ns = engine.open("nvs", "app").unwrap();
            engine.set(&ns, "boots", &TypedValue::U32(3)).unwrap();
            engine.commit(&ns).unwrap();
        }
        fs::write(dir.path().join("nvs.nvs.tmp"), b"half a wri").unwrap();

        let mut engine = FileEngine::open(dir.path()).unwrap();
        engine.init("nvs").unwrap();
        let ns = engine.open("nvs", "app").unwrap();
        assert_eq!(
            engine.get(&ns, "boots", ValueType::U32).unwrap(),
            TypedValue::U32(3)
        );
    }

    #[test]
    fn file_partition_is_locked_once() {
        let dir = tempdir().unwrap();
        let mut first = FileEngine::open(dir.path()).unwrap();
        first.init("nvs").unwrap();
        let mut second = FileEngine::open(dir.path()).unwrap();
        assert!(matches!(
            second.init("nvs"),
            Err(EngineError::Locked { .. })
        ));
    }

    #[test]
    fn file_erase_partition_removes_image() {
        let dir = tempdir().unwrap();
        let mut engine = FileEngine::open(dir.path()).unwrap();
        engine.init("nvs").unwrap();
        let ns = engine.open("nvs", "app").unwrap();
        engine.set(&ns, "k", &TypedValue::I8(-1)).unwrap();
        engine.commit(&ns).unwrap();
        assert!(engine.image_path("nvs").exists());

        engine.erase_partition("nvs").unwrap();
        assert!(!engine.image_path("nvs").exists());
        assert!(matches!(
            engine.get(&ns, "k", ValueType::I8),
            Err(EngineError::InvalidHandle)
        ));
    }
}
