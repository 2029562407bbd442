//! In-memory model of one key-value partition.
//!
//! Both host engines keep their data in a [`Partition`]: committed entries
//! per namespace plus a staging area that only becomes visible to a fresh
//! open after `commit`.

use crate::error::{EngineError, EngineResult};
use crate::value::{TypedValue, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum key and namespace length in bytes.
pub const KEY_MAX_LEN: usize = 15;

/// A stored entry: the type tag plus the encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Tag the entry was written with.
    pub ty: ValueType,
    /// Encoded value.
    pub bytes: Vec<u8>,
}

impl Entry {
    /// Encodes `value` into an entry.
    #[must_use]
    pub fn from_value(value: &TypedValue) -> Self {
        Self {
            ty: value.value_type(),
            bytes: value.encode(),
        }
    }

    /// Decodes the entry as `ty`, failing if the stored tag differs.
    pub fn to_value(&self, ty: ValueType) -> EngineResult<TypedValue> {
        if self.ty != ty {
            return Err(EngineError::TypeMismatch {
                expected: ty,
                actual: Some(self.ty),
            });
        }
        TypedValue::decode(ty, &self.bytes)
    }
}

/// Committed namespaces of a partition, as persisted.
pub type Image = BTreeMap<String, BTreeMap<String, Entry>>;

#[derive(Debug, Default)]
struct Staged {
    cleared: bool,
    writes: BTreeMap<String, Option<Entry>>,
}

/// One partition: committed image plus per-namespace staged changes.
#[derive(Debug, Default)]
pub struct Partition {
    committed: Image,
    staged: BTreeMap<String, Staged>,
}

impl Partition {
    /// Creates a partition from a committed image.
    #[must_use]
    pub fn from_image(committed: Image) -> Self {
        Self {
            committed,
            staged: BTreeMap::new(),
        }
    }

    /// Returns the committed image.
    #[must_use]
    pub fn image(&self) -> &Image {
        &self.committed
    }

    /// Stages a write.
    pub fn set(&mut self, namespace: &str, key: &str, entry: Entry) -> EngineResult<()> {
        check_name("key", key)?;
        self.staged_mut(namespace)
            .writes
            .insert(key.to_owned(), Some(entry));
        Ok(())
    }

    /// Looks a key up, staged changes first.
    #[must_use]
    pub fn get(&self, namespace: &str, key: &str) -> Option<&Entry> {
        if let Some(staged) = self.staged.get(namespace) {
            if let Some(write) = staged.writes.get(key) {
                return write.as_ref();
            }
            if staged.cleared {
                return None;
            }
        }
        self.committed.get(namespace).and_then(|ns| ns.get(key))
    }

    /// Stages removal of one key.
    pub fn remove(&mut self, namespace: &str, key: &str) -> EngineResult<()> {
        if self.get(namespace, key).is_none() {
            return Err(EngineError::not_found(key));
        }
        self.staged_mut(namespace).writes.insert(key.to_owned(), None);
        Ok(())
    }

    /// Stages removal of every key in the namespace.
    pub fn clear(&mut self, namespace: &str) {
        let staged = self.staged_mut(namespace);
        staged.cleared = true;
        staged.writes.clear();
    }

    /// Returns the committed image with the namespace's staged changes
    /// applied, or `None` if nothing is staged.
    ///
    /// The partition itself is unchanged; see [`install`](Self::install).
    #[must_use]
    pub fn staged_image(&self, namespace: &str) -> Option<Image> {
        let staged = self.staged.get(namespace)?;
        let mut image = self.committed.clone();
        let ns = image.entry(namespace.to_owned()).or_default();
        if staged.cleared {
            ns.clear();
        }
        for (key, write) in &staged.writes {
            match write {
                Some(entry) => {
                    ns.insert(key.clone(), entry.clone());
                }
                None => {
                    ns.remove(key);
                }
            }
        }
        if ns.is_empty() {
            image.remove(namespace);
        }
        Some(image)
    }

    /// Replaces the committed image and drops the namespace's staged
    /// changes.
    pub fn install(&mut self, namespace: &str, image: Image) {
        self.committed = image;
        self.staged.remove(namespace);
    }

    /// Applies staged changes of the namespace to the committed image.
    pub fn commit(&mut self, namespace: &str) {
        if let Some(image) = self.staged_image(namespace) {
            self.install(namespace, image);
        }
    }

    /// Drops staged changes of the namespace.
    pub fn discard(&mut self, namespace: &str) {
        self.staged.remove(namespace);
    }

    fn staged_mut(&mut self, namespace: &str) -> &mut Staged {
        self.staged.entry(namespace.to_owned()).or_default()
    }
}

/// Validates a key or namespace name.
pub fn check_name(what: &str, name: &str) -> EngineResult<()> {
    if name.is_empty() {
        return Err(EngineError::invalid_argument(format!("{what} must not be empty")));
    }
    if name.len() > KEY_MAX_LEN {
        return Err(EngineError::invalid_argument(format!(
            "{what} {name:?} is longer than {KEY_MAX_LEN} bytes"
        )));
    }
    Ok(())
}
