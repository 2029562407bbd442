//! Typed key-value backend.

use crate::config::KvConfig;
use crate::contract::{NvStore, StoreSession};
use crate::error::{StoreError, StoreResult};
use nvstore_kv::{EngineError, KvEngine, NamespaceHandle, TypedValue, ValueType, KEY_MAX_LEN};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};

#[derive(Debug)]
struct KvState<E> {
    engine: E,
    handle: Option<NamespaceHandle>,
}

/// A store backed by a flash key-value engine.
///
/// The store owns one namespace of one partition. Its mutex guards the
/// engine and the single namespace handle; a [`KvSession`] holds it from
/// `open` to `close`.
#[derive(Debug)]
pub struct KvStore<E: KvEngine = Box<dyn KvEngine>> {
    partition: String,
    namespace: String,
    state: Mutex<KvState<E>>,
    ready: AtomicBool,
}

impl<E: KvEngine> KvStore<E> {
    /// Creates a store for namespace `namespace` on top of `engine`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidArgument`] if the namespace or the
    /// partition label is empty, or the namespace is too long.
    pub fn new(namespace: impl Into<String>, config: &KvConfig, engine: E) -> StoreResult<Self> {
        let namespace = namespace.into();
        check_id(&namespace)?;
        if config.partition.is_empty() {
            return Err(StoreError::invalid_argument("partition must not be empty"));
        }
        Ok(Self {
            partition: config.partition.clone(),
            namespace,
            state: Mutex::new(KvState {
                engine,
                handle: None,
            }),
            ready: AtomicBool::new(false),
        })
    }

    /// The partition label.
    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Erases the whole partition, every namespace included, and
    /// initialises it again.
    ///
    /// # Errors
    ///
    /// Returns the engine error if erasing or initialising fails; the store
    /// is then no longer ready.
    pub fn erase_partition(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        self.ready.store(false, Ordering::Release);
        warn!(partition = %self.partition, "erasing partition");
        state.engine.erase_partition(&self.partition)?;
        state.engine.init(&self.partition)?;
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    fn init_partition(&self, engine: &mut E) -> StoreResult<()> {
        let partition = self.partition.as_str();
        match engine.init(partition) {
            Ok(()) => Ok(()),
            Err(EngineError::NoFreePages { .. }) => {
                warn!(partition, "partition has no free pages, erasing and re-initialising");
                engine.erase_partition(partition)?;
                engine.init(partition).map_err(|e| {
                    error!(partition, error = %e, "partition init failed after erase");
                    StoreError::Engine(e)
                })
            }
            Err(e) => {
                error!(partition, error = %e, "partition init failed");
                Err(StoreError::Engine(e))
            }
        }
    }
}

impl<E: KvEngine> NvStore for KvStore<E> {
    type Session<'a> = KvSession<'a, E> where Self: 'a;

    fn name(&self) -> &str {
        &self.namespace
    }

    fn init(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        self.init_partition(&mut state.engine)?;

        let handle = state.engine.open(&self.partition, &self.namespace)?;
        state.engine.close(handle);

        self.ready.store(true, Ordering::Release);
        debug!(partition = %self.partition, namespace = %self.namespace, "key-value store ready");
        Ok(())
    }

    fn ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn open(&self) -> StoreResult<KvSession<'_, E>> {
        let mut state = self.state.lock();
        if !self.ready() {
            warn!(namespace = %self.namespace, "open on a store that is not initialised");
            return Err(StoreError::InvalidHandle);
        }
        let handle = state
            .engine
            .open(&self.partition, &self.namespace)
            .map_err(|e| {
                error!(namespace = %self.namespace, error = %e, "failed to open namespace");
                StoreError::Engine(e)
            })?;
        state.handle = Some(handle);
        Ok(KvSession {
            namespace: &self.namespace,
            state,
        })
    }
}

/// An open namespace of a [`KvStore`], holding the store's lock.
#[derive(Debug)]
pub struct KvSession<'a, E: KvEngine> {
    namespace: &'a str,
    state: MutexGuard<'a, KvState<E>>,
}

impl<E: KvEngine> KvSession<'_, E> {
    fn parts(&mut self) -> StoreResult<(&mut E, &NamespaceHandle)> {
        let state = &mut *self.state;
        match state.handle.as_ref() {
            Some(handle) => Ok((&mut state.engine, handle)),
            None => Err(StoreError::InvalidHandle),
        }
    }
}

impl<E: KvEngine> StoreSession for KvSession<'_, E> {
    fn save(&mut self, id: &str, value: &TypedValue) -> StoreResult<usize> {
        let (engine, handle) = self.parts()?;
        check_id(id)?;
        check_value(value)?;

        debug!(id, ty = %value.value_type(), len = value.encoded_len(), "writing value");
        engine.set(handle, id, value).map_err(|source| {
            error!(id, error = %source, "write failed");
            match source {
                EngineError::InvalidArgument { message } => StoreError::InvalidArgument { message },
                source => StoreError::WriteFailed {
                    id: id.to_owned(),
                    source,
                },
            }
        })?;
        commit_or_discard(engine, handle, id)?;
        Ok(value.encoded_len())
    }

    fn restore(&mut self, id: &str, ty: ValueType, capacity: usize) -> StoreResult<TypedValue> {
        let (engine, handle) = self.parts()?;
        check_id(id)?;

        let value = engine
            .get(handle, id, ty)
            .map_err(|e| StoreError::from_engine(id, e))?;
        if ty.is_variable() && value.encoded_len() > capacity {
            return Err(StoreError::Truncated {
                id: id.to_owned(),
                needed: value.encoded_len(),
                capacity,
            });
        }
        debug!(id, %ty, "read value");
        Ok(value)
    }

    fn check_key(&mut self, id: &str) -> bool {
        let Ok((engine, handle)) = self.parts() else {
            warn!(id, "key check without an open handle");
            return false;
        };
        engine.contains(handle, id).unwrap_or_else(|e| {
            debug!(id, error = %e, "key check failed");
            false
        })
    }

    fn remove_key(&mut self, id: &str) -> StoreResult<()> {
        let (engine, handle) = self.parts()?;
        check_id(id)?;
        engine
            .erase_key(handle, id)
            .map_err(|e| StoreError::from_engine(id, e))?;
        commit_or_discard(engine, handle, id)?;
        debug!(id, "removed value");
        Ok(())
    }

    fn erase(&mut self) -> StoreResult<()> {
        let namespace = self.namespace;
        let (engine, handle) = self.parts()?;
        engine.erase_all(handle)?;
        commit_or_discard(engine, handle, namespace)?;
        debug!(namespace, "erased namespace");
        Ok(())
    }
}

impl<E: KvEngine> Drop for KvSession<'_, E> {
    fn drop(&mut self) {
        let state = &mut *self.state;
        match state.handle.take() {
            Some(handle) => state.engine.close(handle),
            None => warn!(namespace = %self.namespace, "close without an open handle"),
        }
    }
}

/// Commits the handle's staged changes; on failure drops them so a later
/// commit cannot make them durable.
fn commit_or_discard<E: KvEngine>(
    engine: &mut E,
    handle: &NamespaceHandle,
    id: &str,
) -> StoreResult<()> {
    engine.commit(handle).map_err(|source| {
        error!(id, error = %source, "commit failed, discarding staged changes");
        engine.discard(handle);
        StoreError::CommitFailed {
            id: id.to_owned(),
            source,
        }
    })
}

fn check_id(id: &str) -> StoreResult<()> {
    if id.is_empty() {
        return Err(StoreError::invalid_argument("identifier must not be empty"));
    }
    if id.len() > KEY_MAX_LEN {
        return Err(StoreError::invalid_argument(format!(
            "identifier {id:?} is longer than {KEY_MAX_LEN} bytes"
        )));
    }
    Ok(())
}

fn check_value(value: &TypedValue) -> StoreResult<()> {
    match value {
        TypedValue::Blob(bytes) if bytes.is_empty() => {
            Err(StoreError::invalid_argument("blob must not be empty"))
        }
        TypedValue::String(s) if s.contains('\0') => {
            Err(StoreError::invalid_argument("string must not contain NUL"))
        }
        _ => Ok(()),
    }
}
