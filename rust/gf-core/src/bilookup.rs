//! Bidirectional key <-> index table used as a feature vocabulary.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("key not found in vocabulary: {0:?}")]
    KeyNotFound(String),
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("io ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("json ({}): {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Key <-> index table.
///
/// `insert` overwrites both directions without collision detection: inserting an
/// existing key or an existing index leaves the stale opposite entry in place
/// (last write wins on each side). Vocabularies built from a
/// [`crate::FrequencyIndex`] are always true bijections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BiLookupDoc", into = "BiLookupDoc")]
pub struct BiLookup {
    forward: FxHashMap<String, usize>,
    reverse: FxHashMap<usize, String>,
}

/// On-disk form; ordered maps keep saved vocabularies byte-stable.
#[derive(Serialize, Deserialize)]
struct BiLookupDoc {
    forward: BTreeMap<String, usize>,
    reverse: BTreeMap<usize, String>,
}

impl From<BiLookupDoc> for BiLookup {
    fn from(d: BiLookupDoc) -> Self {
        Self {
            forward: d.forward.into_iter().collect(),
            reverse: d.reverse.into_iter().collect(),
        }
    }
}

impl From<BiLookup> for BiLookupDoc {
    fn from(b: BiLookup) -> Self {
        Self {
            forward: b.forward.into_iter().collect(),
            reverse: b.reverse.into_iter().collect(),
        }
    }
}

impl BiLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a key -> index mapping.
    pub fn from_index<I, K>(index: I) -> Self
    where
        I: IntoIterator<Item = (K, usize)>,
        K: Into<String>,
    {
        let mut b = Self::new();
        for (k, v) in index {
            b.insert(k, v);
        }
        b
    }

    pub fn insert(&mut self, key: impl Into<String>, value: usize) {
        let key = key.into();
        self.forward.insert(key.clone(), value);
        self.reverse.insert(value, key);
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.forward.get(key).copied()
    }

    pub fn get_reverse(&self, value: usize) -> Option<&str> {
        self.reverse.get(&value).map(String::as_str)
    }

    /// Checked lookup for callers that treat an absent key as an error.
    pub fn require(&self, key: &str) -> Result<usize, LookupError> {
        self.get(key)
            .ok_or_else(|| LookupError::KeyNotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.forward.contains_key(key)
    }

    pub fn contains_reverse(&self, value: usize) -> bool {
        self.reverse.contains_key(&value)
    }

    /// Number of distinct forward keys.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// `(key, index)` pairs ordered by index, then key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        let mut pairs: Vec<(&str, usize)> = self
            .forward
            .iter()
            .map(|(k, &v)| (k.as_str(), v))
            .collect();
        pairs.sort_unstable_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        pairs.into_iter()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LookupError::NotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|source| LookupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| LookupError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LookupError> {
        let path = path.as_ref();
        let bytes = serde_json::to_vec(self).map_err(|source| LookupError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|source| LookupError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| LookupError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
