//! Per-query result store shared by every function invocation of a query.

use crate::function::FunctionId;
use crate::types::{JoinKey, TimeSeries, Value};

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::{PoisonError, RwLock};

/// Default number of lock shards.
pub const DEFAULT_CONTEXT_SHARDS: usize = 16;

/// A single result recorded by a function for one join key.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionValue {
    Aggregation(Value),
    Analysis(bool),
    Transformation(TimeSeries),
}

impl FunctionValue {
    pub fn as_aggregation(&self) -> Option<Value> {
        match self {
            FunctionValue::Aggregation(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_analysis(&self) -> Option<bool> {
        match self {
            FunctionValue::Analysis(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_transformation(&self) -> Option<&TimeSeries> {
        match self {
            FunctionValue::Transformation(s) => Some(s),
            _ => None,
        }
    }
}

// Keyed by function first so lookups borrow both halves of the key.
type Shard = RwLock<HashMap<FunctionId, HashMap<JoinKey, FunctionValue>>>;

/// Mutable accumulator mapping `(function, join key)` to a result.
///
/// The map is split into independently locked shards so that functions (or one
/// function over several groups) running on different threads can write disjoint
/// keys concurrently. Shared by `&` reference; never global.
#[derive(Debug)]
pub struct FunctionContext {
    shards: Box<[Shard]>,
    hasher: RandomState,
}

impl Default for FunctionContext {
    fn default() -> Self {
        Self::with_shards(DEFAULT_CONTEXT_SHARDS)
    }
}

impl FunctionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context with `shards` lock shards (at least one).
    pub fn with_shards(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        FunctionContext {
            shards,
            hasher: RandomState::new(),
        }
    }

    fn shard_for(&self, function: &FunctionId, join_key: &JoinKey) -> &Shard {
        let hash = self.hasher.hash_one((function, join_key));
        &self.shards[(hash % self.shards.len() as u64) as usize]
    }

    /// Records `value` for `(function, join_key)`, returning any value it replaced.
    pub fn add(
        &self,
        function: FunctionId,
        join_key: JoinKey,
        value: FunctionValue,
    ) -> Option<FunctionValue> {
        // Results are plain values, so a writer that panicked cannot leave a shard half-updated.
        let mut shard = self
            .shard_for(&function, &join_key)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        shard.entry(function).or_default().insert(join_key, value)
    }

    pub fn get(&self, function: &FunctionId, join_key: &JoinKey) -> Option<FunctionValue> {
        let shard = self
            .shard_for(function, join_key)
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        shard.get(function)?.get(join_key).cloned()
    }

    pub fn contains(&self, function: &FunctionId, join_key: &JoinKey) -> bool {
        self.get(function, join_key).is_some()
    }

    pub fn aggregation(&self, function: &FunctionId, join_key: &JoinKey) -> Option<Value> {
        self.get(function, join_key)?.as_aggregation()
    }

    pub fn analysis(&self, function: &FunctionId, join_key: &JoinKey) -> Option<bool> {
        self.get(function, join_key)?.as_analysis()
    }

    pub fn transformation(&self, function: &FunctionId, join_key: &JoinKey) -> Option<TimeSeries> {
        match self.get(function, join_key)? {
            FunctionValue::Transformation(series) => Some(series),
            _ => None,
        }
    }

    /// All results recorded for `join_key`, ordered by function id.
    pub fn results_for(&self, join_key: &JoinKey) -> Vec<(FunctionId, FunctionValue)> {
        let mut results = Vec::new();
        for shard in self.shards.iter() {
            let shard = shard.read().unwrap_or_else(PoisonError::into_inner);
            results.extend(shard.iter().filter_map(|(id, by_key)| {
                by_key.get(join_key).map(|value| (id.clone(), value.clone()))
            }));
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    /// Distinct join keys that have at least one result, sorted.
    pub fn join_keys(&self) -> Vec<JoinKey> {
        let mut keys = Vec::new();
        for shard in self.shards.iter() {
            let shard = shard.read().unwrap_or_else(PoisonError::into_inner);
            keys.extend(shard.values().flat_map(|by_key| by_key.keys().cloned()));
        }
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                let shard = shard.read().unwrap_or_else(PoisonError::into_inner);
                shard.values().map(HashMap::len).sum::<usize>()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the context and returns every result.
    pub fn into_results(self) -> HashMap<(FunctionId, JoinKey), FunctionValue> {
        let mut results = HashMap::new();
        for shard in self.shards.into_vec() {
            let shard = shard.into_inner().unwrap_or_else(PoisonError::into_inner);
            for (id, by_key) in shard {
                results.extend(
                    by_key
                        .into_iter()
                        .map(|(join_key, value)| ((id.clone(), join_key), value)),
                );
            }
        }
        results
    }
}
