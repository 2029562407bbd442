//! The capability contract every backend satisfies.

use crate::error::{StoreError, StoreResult};
use nvstore_kv::{TypedValue, ValueType};

/// An open backend handle holding the store's exclusive lock.
///
/// Every operation issued through a session runs under the one lock
/// acquisition taken by [`NvStore::open`]. Closing the session, or dropping
/// it, releases the handle and then the lock.
pub trait StoreSession {
    /// Persists `value` under `id`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidHandle`] if no backend handle is open
    /// - [`StoreError::InvalidArgument`] for an unusable id or value
    /// - a backend error if the write or its commit fails
    fn save(&mut self, id: &str, value: &TypedValue) -> StoreResult<usize>;

    /// Reads the value stored under `id` as type `ty`.
    ///
    /// `capacity` bounds strings (terminator included) and blobs; it is
    /// ignored for scalars.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if nothing is stored under `id`
    /// - [`StoreError::TypeMismatch`] if the stored value has another type
    /// - [`StoreError::Truncated`] if the value is larger than `capacity`
    fn restore(&mut self, id: &str, ty: ValueType, capacity: usize) -> StoreResult<TypedValue>;

    /// Reads the encoding of the value stored under `id` into `buf`,
    /// returning the number of bytes read.
    fn restore_into(&mut self, id: &str, ty: ValueType, buf: &mut [u8]) -> StoreResult<usize> {
        if let Some(width) = ty.fixed_width() {
            if buf.len() < width {
                return Err(StoreError::invalid_argument(format!(
                    "{ty} needs a {width} byte buffer, got {}",
                    buf.len()
                )));
            }
        }
        let bytes = self.restore(id, ty, buf.len())?.encode();
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Whether anything is stored under `id`. Errors read as `false`.
    fn check_key(&mut self, id: &str) -> bool;

    /// Removes the value stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored under `id`.
    fn remove_key(&mut self, id: &str) -> StoreResult<()>;

    /// Removes every value of the store.
    fn erase(&mut self) -> StoreResult<()>;

    /// Releases the handle and the lock.
    fn close(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

/// A non-volatile store.
///
/// Implementations serialize every access through one exclusive lock. The
/// one-shot methods provided here open a session, run one operation and
/// close it again, so they block while another caller holds a session.
///
/// # Example
///
/// ```rust
/// use nvstore_core::{NvStore, StorageManager, StoreConfig, StoreSession};
/// use nvstore_kv::{TypedValue, ValueType};
///
/// let store = StorageManager::from_config(&StoreConfig::new("app")).unwrap();
/// store.init().unwrap();
///
/// let mut session = store.open().unwrap();
/// session.save("counter", &TypedValue::U32(42)).unwrap();
/// assert_eq!(
///     session.restore("counter", ValueType::U32, 0).unwrap(),
///     TypedValue::U32(42)
/// );
/// session.close();
///
/// assert!(store.check_key("counter"));
/// ```
pub trait NvStore: Send + Sync {
    /// The session type returned by [`open`](Self::open).
    type Session<'a>: StoreSession
    where
        Self: 'a;

    /// The store name.
    fn name(&self) -> &str;

    /// Prepares the backend. Idempotent; required before first use.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the backend cannot be brought up, even
    /// after the recovery it is allowed to attempt.
    fn init(&self) -> StoreResult<()>;

    /// Whether [`init`](Self::init) has succeeded. Takes no lock.
    fn ready(&self) -> bool;

    /// Takes the lock and opens the backend handle.
    ///
    /// On failure the lock is released before returning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidHandle`] if the store is not ready, or a
    /// backend error if the handle cannot be opened.
    fn open(&self) -> StoreResult<Self::Session<'_>>;

    /// One-shot [`StoreSession::save`].
    fn save(&self, id: &str, value: &TypedValue) -> StoreResult<usize> {
        self.open()?.save(id, value)
    }

    /// One-shot [`StoreSession::restore`].
    fn restore(&self, id: &str, ty: ValueType, capacity: usize) -> StoreResult<TypedValue> {
        self.open()?.restore(id, ty, capacity)
    }

    /// One-shot [`StoreSession::restore_into`].
    fn restore_into(&self, id: &str, ty: ValueType, buf: &mut [u8]) -> StoreResult<usize> {
        self.open()?.restore_into(id, ty, buf)
    }

    /// One-shot [`StoreSession::check_key`].
    fn check_key(&self, id: &str) -> bool {
        self.open().map_or(false, |mut session| session.check_key(id))
    }

    /// One-shot [`StoreSession::remove_key`].
    fn remove_key(&self, id: &str) -> StoreResult<()> {
        self.open()?.remove_key(id)
    }

    /// One-shot [`StoreSession::erase`].
    fn erase(&self) -> StoreResult<()> {
        self.open()?.erase()
    }
}
