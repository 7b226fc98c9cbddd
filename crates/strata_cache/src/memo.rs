//! Lock-free write-once memoization over immutable snapshots.

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use rustc_hash::FxHashMap;

use crate::error::CacheError;

type Filler<K, V> = dyn Fn(&K) -> Result<Option<FxHashMap<K, V>>, String> + Send + Sync;

/// A thread-safe "compute once, read many" map.
///
/// The current state is an immutable `FxHashMap` behind an [`ArcSwap`].
/// Readers load the snapshot without locking. A miss calls the filler, which
/// may answer with a whole batch of related entries, and publishes
/// `snapshot ∪ batch` with a compare-and-swap, retrying against the newer
/// snapshot whenever another writer got there first.
///
/// Once a key is visible its value never changes: when merging a batch,
/// entries already present in the snapshot win over the batch. The filler
/// must therefore be side-effect free and idempotent; under contention it may
/// run more than once for the same key and the losing results are dropped.
pub struct MemoCell<K, V> {
    snapshot: ArcSwap<FxHashMap<K, V>>,
    filler: Box<Filler<K, V>>,
}

impl<K, V> MemoCell<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + Default,
{
    /// Creates a cell seeded with `initial` and an infallible filler.
    ///
    /// A filler returning `None` means "no information": the key is recorded
    /// with `V::default()`.
    pub fn new<F>(initial: FxHashMap<K, V>, filler: F) -> Self
    where
        F: Fn(&K) -> Option<FxHashMap<K, V>> + Send + Sync + 'static,
    {
        Self::try_new(initial, move |key: &K| Ok(filler(key)))
    }

    /// Creates a cell whose filler may fail. Failures are returned as
    /// [`CacheError::ComputationFailed`] and nothing is recorded for the key,
    /// so the next `get` computes it again.
    pub fn try_new<F>(initial: FxHashMap<K, V>, filler: F) -> Self
    where
        F: Fn(&K) -> Result<Option<FxHashMap<K, V>>, String> + Send + Sync + 'static,
    {
        Self {
            snapshot: ArcSwap::from_pointee(initial),
            filler: Box::new(filler),
        }
    }

    /// Returns the value of `key`, computing and publishing it on a miss.
    pub fn get(&self, key: &K) -> Result<V, CacheError> {
        let mut current = self.snapshot.load_full();
        if let Some(value) = current.get(key) {
            return Ok(value.clone());
        }

        let batch = match (self.filler)(key) {
            Ok(Some(batch)) => batch,
            Ok(None) => {
                let mut miss = FxHashMap::default();
                miss.insert(key.clone(), V::default());
                miss
            }
            Err(reason) => {
                return Err(CacheError::ComputationFailed {
                    key: format!("{key:?}"),
                    reason,
                })
            }
        };
        if !batch.contains_key(key) {
            return Err(CacheError::InconsistentComputation {
                key: format!("{key:?}"),
            });
        }

        loop {
            if let Some(value) = current.get(key) {
                // Another writer published this key while we were computing.
                return Ok(value.clone());
            }

            let mut next = (*current).clone();
            for (k, v) in &batch {
                next.entry(k.clone()).or_insert_with(|| v.clone());
            }
            let value = next.get(key).cloned().unwrap_or_default();

            let previous = self.snapshot.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&previous, &current) {
                return Ok(value);
            }
            tracing::trace!(?key, "memo snapshot changed concurrently, retrying");
            current = Guard::into_inner(previous);
        }
    }

    /// Returns the value of `key` if it has already been published.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.snapshot.load().get(key).cloned()
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<FxHashMap<K, V>> {
        self.snapshot.load_full()
    }

    /// Returns the number of published keys.
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Returns `true` if no key has been published.
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }
}

impl<K: Debug, V: Debug> Debug for MemoCell<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCell")
            .field("snapshot", &**self.snapshot.load())
            .finish_non_exhaustive()
    }
}
