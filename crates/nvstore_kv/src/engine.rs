//! Flash key-value engine trait definition.

use crate::error::EngineResult;
use crate::value::{TypedValue, ValueType};
use std::fmt;

/// An open namespace inside a partition.
///
/// Handles are created by [`KvEngine::open`] and given back through
/// [`KvEngine::close`]. They are deliberately not `Clone`: one handle, one
/// close.
#[derive(Debug, PartialEq, Eq)]
pub struct NamespaceHandle {
    partition: String,
    namespace: String,
}

impl NamespaceHandle {
    /// Creates a handle. Only engines should call this.
    #[must_use]
    pub fn new(partition: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            namespace: namespace.into(),
        }
    }

    /// The partition label.
    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// The namespace name.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// A typed key-value flash engine.
///
/// This is the low-level engine the key-value backend sits on. It owns page
/// management and persistence; callers only see typed entries grouped in
/// namespaces inside a labelled partition.
///
/// # Invariants
///
/// - `set`, `erase_key` and `erase_all` are staged; they become durable only
///   after `commit` on the same handle
/// - `get` sees staged changes of the handle's namespace
/// - a failed `commit` leaves the committed state as it was
/// - `get` with a tag other than the stored one fails with `TypeMismatch`
/// - after `erase_partition` every handle on that partition is invalid
///
/// # Implementors
///
/// - [`super::MemoryEngine`] - volatile, with fault injection for tests
/// - [`super::FileEngine`] - partition images on the host file system
pub trait KvEngine: Send + fmt::Debug {
    /// Initialises a partition.
    ///
    /// # Errors
    ///
    /// Returns [`NoFreePages`](crate::EngineError::NoFreePages) when the
    /// partition structure is full or corrupted and must be erased first.
    fn init(&mut self, partition: &str) -> EngineResult<()>;

    /// Erases every page of a partition, leaving it uninitialised.
    fn erase_partition(&mut self, partition: &str) -> EngineResult<()>;

    /// Opens a namespace for reading and writing.
    fn open(&mut self, partition: &str, namespace: &str) -> EngineResult<NamespaceHandle>;

    /// Closes a namespace, discarding uncommitted changes.
    fn close(&mut self, handle: NamespaceHandle);

    /// Stages a typed write.
    fn set(&mut self, handle: &NamespaceHandle, key: &str, value: &TypedValue)
        -> EngineResult<()>;

    /// Reads a typed value.
    fn get(&mut self, handle: &NamespaceHandle, key: &str, ty: ValueType)
        -> EngineResult<TypedValue>;

    /// Returns whether a key exists, with any tag.
    fn contains(&self, handle: &NamespaceHandle, key: &str) -> EngineResult<bool>;

    /// Stages removal of one key.
    fn erase_key(&mut self, handle: &NamespaceHandle, key: &str) -> EngineResult<()>;

    /// Stages removal of every key in the namespace.
    fn erase_all(&mut self, handle: &NamespaceHandle) -> EngineResult<()>;

    /// Makes staged changes durable.
    ///
    /// On error the committed state is unchanged and the staged changes are
    /// still pending; callers that give up on them call `discard`.
    fn commit(&mut self, handle: &NamespaceHandle) -> EngineResult<()>;

    /// Drops the handle's staged changes, keeping the handle open.
    fn discard(&mut self, handle: &NamespaceHandle);
}

impl<E: KvEngine + ?Sized> KvEngine for Box<E> {
    fn init(&mut self, partition: &str) -> EngineResult<()> {
        (**self).init(partition)
    }

    fn erase_partition(&mut self, partition: &str) -> EngineResult<()> {
        (**self).erase_partition(partition)
    }

    fn open(&mut self, partition: &str, namespace: &str) -> EngineResult<NamespaceHandle> {
        (**self).open(partition, namespace)
    }

    fn close(&mut self, handle: NamespaceHandle) {
        (**self).close(handle);
    }

    fn set(
        &mut self,
        handle: &NamespaceHandle,
        key: &str,
        value: &TypedValue,
    ) -> EngineResult<()> {
        (**self).set(handle, key, value)
    }

    fn get(
        &mut self,
        handle: &NamespaceHandle,
        key: &str,
        ty: ValueType,
    ) -> EngineResult<TypedValue> {
        (**self).get(handle, key, ty)
    }

    fn contains(&self, handle: &NamespaceHandle, key: &str) -> EngineResult<bool> {
        (**self).contains(handle, key)
    }

    fn erase_key(&mut self, handle: &NamespaceHandle, key: &str) -> EngineResult<()> {
        (**self).erase_key(handle, key)
    }

    fn erase_all(&mut self, handle: &NamespaceHandle) -> EngineResult<()> {
        (**self).erase_all(handle)
    }

    fn commit(&mut self, handle: &NamespaceHandle) -> EngineResult<()> {
        (**self).commit(handle)
    }

    fn discard(&mut self, handle: &NamespaceHandle) {
        (**self).discard(handle);
    }
}
