//! In-memory key-value engine for testing.

use crate::engine::{KvEngine, NamespaceHandle};
use crate::error::{EngineError, EngineResult};
use crate::partition::{check_name, Entry, Partition};
use crate::value::{TypedValue, ValueType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Slot {
    initialised: bool,
    corrupted: bool,
    data: Partition,
}

#[derive(Debug, Default)]
struct MemoryState {
    partitions: HashMap<String, Slot>,
    fail_next_set: bool,
    fail_next_commit: bool,
    erase_count: usize,
}

/// A volatile key-value engine.
///
/// Clones share the same partitions, so a test can keep one clone for
/// fault injection while a store owns the other.
///
/// # Example
///
/// ```rust
/// use nvstore_kv::{KvEngine, MemoryEngine, TypedValue, ValueType};
///
/// let mut engine = MemoryEngine::new();
/// engine.init("nvs").unwrap();
/// let ns = engine.open("nvs", "app").unwrap();
/// engine.set(&ns, "boots", &TypedValue::U16(3)).unwrap();
/// engine.commit(&ns).unwrap();
/// assert_eq!(engine.get(&ns, "boots", ValueType::U16).unwrap(), TypedValue::U16(3));
/// engine.close(ns);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryEngine {
    /// Creates an engine with no partitions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a partition as having no free pages.
    ///
    /// `init` fails with [`EngineError::NoFreePages`] until the partition
    /// is erased.
    pub fn corrupt(&self, partition: &str) {
        let mut state = self.state.lock();
        let slot = state.partitions.entry(partition.to_owned()).or_default();
        slot.corrupted = true;
        slot.initialised = false;
    }

    /// Makes the next `set` fail with an I/O error.
    pub fn fail_next_set(&self) {
        self.state.lock().fail_next_set = true;
    }

    /// Makes the next `commit` fail with an I/O error.
    pub fn fail_next_commit(&self) {
        self.state.lock().fail_next_commit = true;
    }

    /// Number of partition erases performed so far.
    #[must_use]
    pub fn erase_count(&self) -> usize {
        self.state.lock().erase_count
    }

    /// Returns the committed entry for a key, ignoring staged changes.
    #[must_use]
    pub fn committed(&self, partition: &str, namespace: &str, key: &str) -> Option<Entry> {
        let state = self.state.lock();
        state
            .partitions
            .get(partition)
            .and_then(|slot| slot.data.image().get(namespace))
            .and_then(|ns| ns.get(key))
            .cloned()
    }
}

impl MemoryState {
    fn slot(&mut self, handle: &NamespaceHandle) -> EngineResult<&mut Slot> {
        match self.partitions.get_mut(handle.partition()) {
            Some(slot) if slot.initialised => Ok(slot),
            _ => Err(EngineError::InvalidHandle),
        }
    }
}

fn injected(what: &str) -> EngineError {
    EngineError::Io(io::Error::new(
        io::ErrorKind::Other,
        format!("injected {what} failure"),
    ))
}

impl KvEngine for MemoryEngine {
    fn init(&mut self, partition: &str) -> EngineResult<()> {
        let mut state = self.state.lock();
        let slot = state.partitions.entry(partition.to_owned()).or_default();
        if slot.corrupted {
            return Err(EngineError::NoFreePages {
                partition: partition.to_owned(),
            });
        }
        slot.initialised = true;
        Ok(())
    }

    fn erase_partition(&mut self, partition: &str) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.partitions.insert(partition.to_owned(), Slot::default());
        state.erase_count += 1;
        Ok(())
    }

    fn open(&mut self, partition: &str, namespace: &str) -> EngineResult<NamespaceHandle> {
        check_name("namespace", namespace)?;
        let state = self.state.lock();
        match state.partitions.get(partition) {
            Some(slot) if slot.initialised => Ok(NamespaceHandle::new(partition, namespace)),
            _ => Err(EngineError::NotInitialized {
                partition: partition.to_owned(),
            }),
        }
    }

    fn close(&mut self, handle: NamespaceHandle) {
        let mut state = self.state.lock();
        if let Some(slot) = state.partitions.get_mut(handle.partition()) {
            slot.data.discard(handle.namespace());
        }
    }

    fn set(
        &mut self,
        handle: &NamespaceHandle,
        key: &str,
        value: &TypedValue,
    ) -> EngineResult<()> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_set) {
            return Err(injected("set"));
        }
        let slot = state.slot(handle)?;
        slot.data
            .set(handle.namespace(), key, Entry::from_value(value))
    }

    fn get(
        &mut self,
        handle: &NamespaceHandle,
        key: &str,
        ty: ValueType,
    ) -> EngineResult<TypedValue> {
        let mut state = self.state.lock();
        let slot = state.slot(handle)?;
        slot.data
            .get(handle.namespace(), key)
            .ok_or_else(|| EngineError::not_found(key))?
            .to_value(ty)
    }

    fn contains(&self, handle: &NamespaceHandle, key: &str) -> EngineResult<bool> {
        let mut state = self.state.lock();
        let slot = state.slot(handle)?;
        Ok(slot.data.get(handle.namespace(), key).is_some())
    }

    fn erase_key(&mut self, handle: &NamespaceHandle, key: &str) -> EngineResult<()> {
        let mut state = self.state.lock();
        let slot = state.slot(handle)?;
        slot.data.remove(handle.namespace(), key)
    }

    fn erase_all(&mut self, handle: &NamespaceHandle) -> EngineResult<()> {
        let mut state = self.state.lock();
        let slot = state.slot(handle)?;
        slot.data.clear(handle.namespace());
        Ok(())
    }

    fn commit(&mut self, handle: &NamespaceHandle) -> EngineResult<()> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_commit) {
            return Err(injected("commit"));
        }
        let slot = state.slot(handle)?;
        slot.data.commit(handle.namespace());
        Ok(())
    }

    fn discard(&mut self, handle: &NamespaceHandle) {
        let mut state = self.state.lock();
        if let Some(slot) = state.partitions.get_mut(handle.partition()) {
            slot.data.discard(handle.namespace());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_app(engine: &mut MemoryEngine) -> NamespaceHandle {
        engine.init("nvs").unwrap();
        engine.open("nvs", "app").unwrap()
    }

    #[test]
    fn memory_open_requires_init() {
        let mut engine = MemoryEngine::new();
        assert!(matches!(
            engine.open("nvs", "app"),
            Err(EngineError::NotInitialized { .. })
        ));
    }

    #[test]
    fn memory_set_commit_get() {
        let mut engine = MemoryEngine::new();
        let ns = open_app(&mut engine);
        engine.set(&ns, "name", &TypedValue::String("pump".into())).unwrap();
        engine.commit(&ns).unwrap();
        engine.close(ns);

        let ns = engine.open("nvs", "app").unwrap();
        assert_eq!(
            engine.get(&ns, "name", ValueType::String).unwrap(),
            TypedValue::String("pump".into())
        );
    }

    #[test]
    fn memory_close_discards_uncommitted() {
        let mut engine = MemoryEngine::new();
        let ns = open_app(&mut engine);
        engine.set(&ns, "x", &TypedValue::U8(1)).unwrap();
        engine.close(ns);

        let ns = engine.open("nvs", "app").unwrap();
        assert!(!engine.contains(&ns, "x").unwrap());
    }

    #[test]
    fn memory_namespaces_are_isolated() {
        let mut engine = MemoryEngine::new();
        let a = open_app(&mut engine);
        let b = engine.open("nvs", "other").unwrap();
        engine.set(&a, "k", &TypedValue::U8(1)).unwrap();
        engine.commit(&a).unwrap();
        assert!(!engine.contains(&b, "k").unwrap());
    }

    #[test]
    fn memory_corrupt_partition_needs_erase() {
        let mut engine = MemoryEngine::new();
        engine.corrupt("nvs");
        assert!(matches!(
            engine.init("nvs"),
            Err(EngineError::NoFreePages { .. })
        ));
        engine.erase_partition("nvs").unwrap();
        engine.init("nvs").unwrap();
        assert_eq!(engine.erase_count(), 1);
    }

    #[test]
    fn memory_erase_partition_invalidates_handles() {
        let mut engine = MemoryEngine::new();
        let ns = open_app(&mut engine);
        engine.erase_partition("nvs").unwrap();
        assert!(matches!(
            engine.set(&ns, "k", &TypedValue::U8(1)),
            Err(EngineError::InvalidHandle)
        ));
    }

    #[test]
    fn memory_injected_commit_failure_leaves_committed_state() {
        let mut engine = MemoryEngine::new();
        let ns = open_app(&mut engine);
        engine.set(&ns, "k", &TypedValue::U8(1)).unwrap();
        engine.fail_next_commit();
        assert!(matches!(engine.commit(&ns), Err(EngineError::Io(_))));
        assert!(engine.committed("nvs", "app", "k").is_none());

        engine.discard(&ns);
        assert!(!engine.contains(&ns, "k").unwrap());
        engine.set(&ns, "j", &TypedValue::U8(2)).unwrap();
        engine.commit(&ns).unwrap();
        assert!(engine.committed("nvs", "app", "k").is_none());
        assert!(engine.committed("nvs", "app", "j").is_some());
    }
}
