//! Entity identity registry.
//!
//! Every persisted actor carries a stable string key that addresses its blob
//! in the state store. Keys are minted once in an authoring context and
//! baked into scene data; the registry's job is to guarantee they stay
//! unique for the actors that are actually alive. Unresolved collisions
//! cause save-state cross-contamination, so they are logged loudly and
//! resolved deterministically: the first claimant keeps the key, the
//! newcomer is re-keyed.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

/// Transient identity of a live actor instance. Never persisted.
pub type InstanceId = Uuid;

/// Mint a fresh globally-unique entity key.
pub fn fresh_key() -> String {
    Uuid::new_v4().to_string()
}

/// Tracks which live instance owns each entity key.
///
/// Owned by the [`World`](crate::world::World) that spawned the actors;
/// constructed at session start and torn down with it, so state never leaks
/// across worlds or tests.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    claims: HashMap<String, InstanceId>,
    live: HashSet<InstanceId>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an instance as live. Called when an actor enters a world.
    pub fn register(&mut self, instance: InstanceId) {
        self.live.insert(instance);
    }

    /// Mark an instance as gone. Its claims become stale and may be
    /// supplanted by any later claimant.
    pub fn unregister(&mut self, instance: InstanceId) {
        self.live.remove(&instance);
    }

    /// Ensure `key` uniquely identifies `instance`.
    ///
    /// An empty key, or a key already claimed by a *different* live
    /// instance, is replaced with a freshly minted one. A key whose claimant
    /// is no longer live is supplanted. Returns `true` when the key was
    /// changed.
    pub fn ensure_unique_key(&mut self, instance: InstanceId, key: &mut String) -> bool {
        self.live.insert(instance);

        if key.is_empty() {
            *key = fresh_key();
            self.claims.insert(key.clone(), instance);
            debug!(key = %key, "minted key for unkeyed entity");
            return true;
        }

        match self.claims.get(key.as_str()).copied() {
            None => {
                self.claims.insert(key.clone(), instance);
                false
            }
            Some(owner) if owner == instance => false,
            Some(owner) if !self.live.contains(&owner) => {
                debug!(key = %key, "supplanting stale claim");
                self.claims.insert(key.clone(), instance);
                false
            }
            Some(_) => {
                let old = std::mem::replace(key, fresh_key());
                self.claims.insert(key.clone(), instance);
                warn!(
                    old_key = %old,
                    new_key = %key,
                    "entity key collision, re-keyed the new claimant"
                );
                true
            }
        }
    }

    /// Current claimant of a key, live or stale.
    pub fn claimant(&self, key: &str) -> Option<InstanceId> {
        self.claims.get(key).copied()
    }

    pub fn is_live(&self, instance: InstanceId) -> bool {
        self.live.contains(&instance)
    }
}
