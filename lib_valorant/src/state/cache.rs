//! # Identity Cache
//!
//! A first-write-wins map from natural key to one shared `Arc` per entity.
//! Payloads are decoded only when their key is not cached yet.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::errors::ValorantError;
use crate::models::Identified;

/// Natural key → canonical shared instance, for one entity kind.
///
/// The first instance stored under a key is kept until it is removed or the
/// cache is cleared; later payloads for the same key are discarded.
pub struct IdentityCache<T> {
    entries: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> Default for IdentityCache<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> std::fmt::Debug for IdentityCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCache").field("len", &self.read().len()).finish()
    }
}

impl<T> IdentityCache<T> {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<T>>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<T>>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Arc<T>> {
        self.write().remove(key)
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of every cached instance, in no particular order.
    pub fn values(&self) -> Vec<Arc<T>> {
        self.read().values().cloned().collect()
    }
}

impl<T: Identified> IdentityCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches `value` unless its key is already present, and returns the
    /// canonical instance either way.
    pub fn insert_if_absent(&self, value: T) -> Arc<T> {
        let mut entries = self.write();
        match entries.get(value.id()) {
            Some(existing) => Arc::clone(existing),
            None => {
                trace!(kind = T::KIND, key = value.id(), "caching new entity");
                let key = value.id().to_owned();
                let value = Arc::new(value);
                entries.insert(key, Arc::clone(&value));
                value
            }
        }
    }

    /// Returns the cached instance for `key`, or builds, caches and returns
    /// a new one. `build` is not called on a hit.
    ///
    /// Two racing misses may both build; the first insert wins and the loser
    /// gets the winner's instance.
    pub fn store_or_get_with<F, E>(&self, key: &str, build: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(existing) = self.get(key) {
            return Ok(existing);
        }
        Ok(self.insert_if_absent(build()?))
    }
}

impl<T: Identified + DeserializeOwned> IdentityCache<T> {
    /// Maps a raw payload to the canonical instance for its natural key,
    /// decoding it only when the key is not cached yet.
    pub fn store_or_get(&self, payload: Value) -> Result<Arc<T>, ValorantError> {
        let key = natural_key::<T>(&payload)?;
        self.store_or_get_with(&key, move || decode::<T>(payload))
    }
}

/// Reads `T::KEY_FIELD` out of a payload.
pub(crate) fn natural_key<T: Identified>(payload: &Value) -> Result<String, ValorantError> {
    payload
        .get(T::KEY_FIELD)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ValorantError::Decode {
            kind: T::KIND,
            source: serde::de::Error::missing_field(T::KEY_FIELD),
        })
}

pub(crate) fn decode<T: Identified + DeserializeOwned>(payload: Value) -> Result<T, ValorantError> {
    serde_json::from_value(payload).map_err(|source| ValorantError::Decode { kind: T::KIND, source })
}
