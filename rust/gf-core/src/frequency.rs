//! Key frequency counting and deterministic vocabulary index assignment.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrequencyError {
    #[error("pinned slot {slot} for key {key:?} is outside a vocabulary of {size} keys")]
    PinnedSlotOutOfRange {
        key: String,
        slot: usize,
        size: usize,
    },
    #[error("keys {first:?} and {second:?} are both pinned to slot {slot}")]
    PinnedSlotConflict {
        slot: usize,
        first: String,
        second: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct FrequencyIndex {
    counts: FxHashMap<String, u64>,
}

impl FrequencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: &str) {
        if let Some(c) = self.counts.get_mut(key) {
            *c += 1;
        } else {
            self.counts.insert(key.to_string(), 1);
        }
    }

    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Drop every key seen fewer than `min` times (`== min` is kept).
    pub fn remove_less_than(&mut self, min: u64) {
        self.counts.retain(|_, c| *c >= min);
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.counts.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Assign indices in lexicographic (byte) key order.
    pub fn build_index(&self) -> BTreeMap<String, usize> {
        self.sorted_keys()
            .into_iter()
            .enumerate()
            .map(|(i, k)| (k.to_string(), i))
            .collect()
    }

    /// Assign indices with some keys pinned to fixed slots.
    ///
    /// Pinned keys that were counted go to their slot first; the remaining slots
    /// are filled in ascending order from the sorted unpinned keys. Pinned keys
    /// that were never counted are ignored.
    pub fn build_index_pinned(
        &self,
        pinned: &BTreeMap<String, usize>,
    ) -> Result<BTreeMap<String, usize>, FrequencyError> {
        let size = self.counts.len();
        let mut slots: Vec<Option<&str>> = vec![None; size];

        for (key, &slot) in pinned {
            if !self.counts.contains_key(key) {
                continue;
            }
            if slot >= size {
                return Err(FrequencyError::PinnedSlotOutOfRange {
                    key: key.clone(),
                    slot,
                    size,
                });
            }
            if let Some(first) = slots[slot] {
                return Err(FrequencyError::PinnedSlotConflict {
                    slot,
                    first: first.to_string(),
                    second: key.clone(),
                });
            }
            slots[slot] = Some(key.as_str());
        }

        let mut rest = self
            .sorted_keys()
            .into_iter()
            .filter(|k| !pinned.contains_key(*k));
        for slot in slots.iter_mut() {
            if slot.is_none() {
                *slot = rest.next();
            }
        }

        Ok(slots
            .into_iter()
            .enumerate()
            .filter_map(|(i, k)| k.map(|k| (k.to_string(), i)))
            .collect())
    }

    /// Counts sorted descending, ties broken by ascending key.
    pub fn sorted_counts(&self) -> Vec<(String, u64)> {
        let mut pairs: Vec<(String, u64)> =
            self.counts.iter().map(|(k, &c)| (k.clone(), c)).collect();
        pairs.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        pairs
    }

    /// The `k` most frequent keys (all of them if `k >= len`).
    pub fn top(&self, k: usize) -> Vec<(String, u64)> {
        let mut sorted = self.sorted_counts();
        sorted.truncate(k);
        sorted
    }
}
