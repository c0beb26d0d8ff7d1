//! Cross-site memoization cache
//!
//! ## Table of Contents
//! - **Cache**: DashMap-backed memoization table, at-most-once per key
//! - **ScenarioKey**: Scenario-equivalence key with exact float equality

use crate::error::Result;
use crate::function::VulnerabilityFunction;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Memoization table keyed on scenario equivalence
///
/// A pure memoization store for the duration of a run: entries are created
/// lazily on first miss and never evicted. `get_or_compute` holds the key's
/// shard lock while computing, so a given key is computed at most once even
/// under a parallel region scan.
#[derive(Debug)]
pub struct Cache<K: Eq + Hash, V> {
    map: DashMap<K, Arc<V>>,
}

impl<K: Eq + Hash, V> Cache<K, V> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Look up a previously stored value
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.map.get(key).map(|e| e.value().clone())
    }

    /// Store a value, replacing any previous entry for the key
    pub fn put(&self, key: K, value: V) {
        self.map.insert(key, Arc::new(value));
    }

    /// Return the cached value for `key`, computing and storing it on a miss
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> Result<V>) -> Result<Arc<V>> {
        match self.map.entry(key) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(e) => {
                let value = Arc::new(compute()?);
                e.insert(value.clone());
                Ok(value)
            }
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Eq + Hash, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Key identifying a deterministic scenario: vulnerability function identity
/// plus the scenario mean and coefficient of variation
///
/// The floats are compared bit-for-bit on purpose. Mean and cov are parsed
/// once from a source file, so repeated lookups carry identical bits; the
/// epsilon tolerance applied to site coordinates does not apply here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScenarioKey {
    code: String,
    mean_bits: u64,
    cov_bits: u64,
}

impl ScenarioKey {
    /// Build a key from the vulnerability function in play and the scenario moments
    pub fn new(function: &VulnerabilityFunction, mean: f64, cov: f64) -> Self {
        Self {
            code: function.code().to_string(),
            mean_bits: mean.to_bits(),
            cov_bits: cov.to_bits(),
        }
    }
}
