//! Per-key request generations for discarding stale async results.

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

/// Tag attached to an issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Tracks the latest generation issued per key.
///
/// A result is applied only if its generation is still the latest for its key.
/// Invalidating a key bumps its generation without issuing a request, so every
/// request in flight for it is discarded on arrival.
#[derive(Debug)]
pub struct GenerationTracker<K> {
    latest: HashMap<K, u64>,
}

impl<K> Default for GenerationTracker<K> {
    fn default() -> Self {
        Self {
            latest: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> GenerationTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next generation for `key`.
    pub fn issue(&mut self, key: &K) -> Generation {
        let next = self.latest.get(key).map_or(1, |g| g + 1);
        self.latest.insert(key.clone(), next);
        Generation(next)
    }

    pub fn is_current(&self, key: &K, generation: Generation) -> bool {
        self.latest.get(key) == Some(&generation.0)
    }

    pub fn latest(&self, key: &K) -> Option<Generation> {
        self.latest.get(key).copied().map(Generation)
    }

    /// Discard whatever is in flight for `key`.
    pub fn invalidate(&mut self, key: &K) {
        if let Some(g) = self.latest.get_mut(key) {
            *g += 1;
        }
    }

    /// Discard everything in flight.
    pub fn invalidate_all(&mut self) {
        for g in self.latest.values_mut() {
            *g += 1;
        }
    }
}
