//! # Connection State
//!
//! One [`IdentityCache`] per entity kind, owned by a client connection.
//! Every decoded entity passes through here so that a given natural key maps
//! to exactly one shared instance for the lifetime of the connection (or
//! until it is evicted).

use std::sync::Arc;

use serde_json::Value;

use crate::errors::ValorantError;
use crate::models::buddy::BuddyPayload;
use crate::models::{Account, Agent, Buddy, BuddyLevel, Ceremony, Identified};

/// Identity-mapped entity caches.
pub mod cache;

pub use cache::IdentityCache;
use cache::natural_key;

#[derive(Debug, Default)]
pub struct ConnectionState {
    agents: IdentityCache<Agent>,
    buddies: IdentityCache<Buddy>,
    buddy_levels: IdentityCache<BuddyLevel>,
    ceremonies: IdentityCache<Ceremony>,
    accounts: IdentityCache<Account>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agents(&self) -> &IdentityCache<Agent> {
        &self.agents
    }

    pub fn buddies(&self) -> &IdentityCache<Buddy> {
        &self.buddies
    }

    pub fn buddy_levels(&self) -> &IdentityCache<BuddyLevel> {
        &self.buddy_levels
    }

    pub fn ceremonies(&self) -> &IdentityCache<Ceremony> {
        &self.ceremonies
    }

    pub fn accounts(&self) -> &IdentityCache<Account> {
        &self.accounts
    }

    pub fn store_agent(&self, payload: Value) -> Result<Arc<Agent>, ValorantError> {
        self.agents.store_or_get(payload)
    }

    pub fn store_buddy_level(&self, payload: Value) -> Result<Arc<BuddyLevel>, ValorantError> {
        self.buddy_levels.store_or_get(payload)
    }

    pub fn store_ceremony(&self, payload: Value) -> Result<Arc<Ceremony>, ValorantError> {
        self.ceremonies.store_or_get(payload)
    }

    pub fn store_account(&self, payload: Value) -> Result<Arc<Account>, ValorantError> {
        self.accounts.store_or_get(payload)
    }

    /// Stores a buddy and, when the buddy is new, each of its levels.
    ///
    /// Levels already in the level cache are left untouched and the buddy
    /// refers to the cached instance; unseen levels are inserted. A cache hit
    /// on the buddy itself touches no level.
    pub fn store_buddy(&self, payload: Value) -> Result<Arc<Buddy>, ValorantError> {
        let key = natural_key::<Buddy>(&payload)?;
        self.buddies.store_or_get_with(&key, move || {
            let raw: BuddyPayload =
                serde_json::from_value(payload).map_err(|source| ValorantError::Decode { kind: Buddy::KIND, source })?;
            Ok(raw.into_buddy(|level| self.buddy_levels.insert_if_absent(level)))
        })
    }

    /// Evicts every cached entity of every kind.
    pub fn clear(&self) {
        self.agents.clear();
        self.buddies.clear();
        self.buddy_levels.clear();
        self.ceremonies.clear();
        self.accounts.clear();
    }
}

/// Runs `store` over every element of a JSON array payload.
pub(crate) fn store_each<T, F>(payload: Value, store: F) -> Result<Vec<Arc<T>>, ValorantError>
where
    T: Identified,
    F: FnMut(Value) -> Result<Arc<T>, ValorantError>,
{
    let items: Vec<Value> =
        serde_json::from_value(payload).map_err(|source| ValorantError::Decode { kind: T::KIND, source })?;
    items.into_iter().map(store).collect()
}
