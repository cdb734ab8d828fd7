//! Process-wide caches shared by every translated method of a [`crate::metadata::typesystem::Domain`].
//!
//! Both caches are insert-if-absent: concurrent callers registering the same literal or the
//! same static field observe the same result, and a duplicate registration is a no-op.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::metadata::typesystem::{IdentityHash, RuntimeType};

/// Hash-keyed store of string literals loaded by `ldstr`.
///
/// The key of a literal is its content hash. If two different literals hash to the same key,
/// the later one is re-probed with a derived hash until a free or matching slot is found, so
/// every distinct literal has exactly one entry.
pub struct StringCache {
    entries: DashMap<u64, Arc<str>>,
}

impl StringCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty cache with room for `capacity` literals
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        StringCache {
            entries: DashMap::with_capacity(capacity),
        }
    }

    /// Register `text` and return its key; registering the same text again is a no-op
    pub fn intern(&self, text: &str) -> u64 {
        let mut hash = IdentityHash::new()
            .add_component("ldstr")
            .add_component(text)
            .finalize();

        loop {
            match self.entries.entry(hash) {
                Entry::Occupied(existing) => {
                    if &**existing.get() == text {
                        return hash;
                    }
                    log::warn!(
                        "String cache collision on 0x{hash:016X} between {:?} and {text:?}, re-probing",
                        &**existing.get()
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(Arc::from(text));
                    return hash;
                }
            }
            hash = IdentityHash::new()
                .add_identity(hash)
                .add_component(text)
                .finalize();
        }
    }

    /// Look up a literal by key
    #[must_use]
    pub fn get(&self, hash: u64) -> Option<Arc<str>> {
        self.entries.get(&hash).map(|entry| entry.value().clone())
    }

    /// Number of distinct literals
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no literal has been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StringCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The wide static field address space.
///
/// Every type owning static fields is assigned a dense type number the first time one of its
/// static fields is addressed. A static slot is `(type number << 32) | field index`, which keeps
/// static storage disjoint from instance layouts and unique across generic instantiations.
pub struct StaticFieldTable {
    type_numbers: DashMap<u64, u32>,
    next_number: AtomicU32,
}

impl StaticFieldTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        StaticFieldTable {
            type_numbers: DashMap::new(),
            next_number: AtomicU32::new(1),
        }
    }

    /// Wide slot of the static field at `field_index` within `owner`
    pub fn slot(&self, owner: &RuntimeType, field_index: u32) -> u64 {
        let number = *self
            .type_numbers
            .entry(owner.identity())
            .or_insert_with(|| self.next_number.fetch_add(1, Ordering::Relaxed));

        (u64::from(number) << 32) | u64::from(field_index)
    }

    /// Number of types with assigned static storage
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.type_numbers.len()
    }
}

impl Default for StaticFieldTable {
    fn default() -> Self {
        Self::new()
    }
}
