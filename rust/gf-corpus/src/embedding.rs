//! Word embedding models.
//!
//! Models are read from the word2vec text format:
//!
//! ```text
//! <words> <width>
//! the 0.12 -0.5 ...
//! dog 0.3 0.01 ...
//! ```
//!
//! Vectors are scaled to unit length at load. An [`EmbeddingCache`] owns loaded
//! models keyed by path; each pipeline passes its own cache explicitly.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("io ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed embedding model ({source_name}, line {line}): {msg}")]
    MalformedInput {
        source_name: String,
        line: usize,
        msg: String,
    },
}

/// Fixed-width token -> vector lookup.
pub trait EmbeddingModel: Send + Sync {
    fn vector(&self, token: &str) -> Option<&[f32]>;
    fn width(&self) -> usize;
    fn vocabulary_size(&self) -> usize;
}

#[derive(Debug, Clone, Default)]
pub struct TextEmbeddingModel {
    width: usize,
    vectors: FxHashMap<String, Vec<f32>>,
}

const MAX_RESERVED_WORDS: usize = 1 << 20;

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

impl TextEmbeddingModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EmbeddingError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EmbeddingError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| EmbeddingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Parse word2vec text. `source_name` only labels errors.
    pub fn parse(text: &str, source_name: &str) -> Result<Self, EmbeddingError> {
        let bad = |line: usize, msg: String| EmbeddingError::MalformedInput {
            source_name: source_name.to_string(),
            line,
            msg,
        };

        let mut lines = text.lines().enumerate();
        let header = lines
            .next()
            .map(|(_, l)| l)
            .ok_or_else(|| bad(1, "empty file".to_string()))?;
        let dims: Vec<usize> = header
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| bad(1, "header must be `<number of words> <vector width>`".to_string()))?;
        let &[words, width] = dims.as_slice() else {
            return Err(bad(1, "header must be `<number of words> <vector width>`".to_string()));
        };

        // Header word count is a hint, not a bound.
        let mut vectors = FxHashMap::default();
        vectors.reserve(words.min(MAX_RESERVED_WORDS));
        for (i, line) in lines {
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let mut values = parts
                .map(str::parse::<f32>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| bad(i + 1, format!("{word:?}: {e}")))?;
            if let Some(pos) = values.iter().position(|x| !x.is_finite()) {
                return Err(bad(i + 1, format!("{word:?}: value {pos} is not finite")));
            }
            if values.len() != width {
                return Err(bad(
                    i + 1,
                    format!("{word:?} has {} values, expected {width}", values.len()),
                ));
            }
            normalize(&mut values);
            vectors.entry(word.to_string()).or_insert(values);
        }

        Ok(Self { width, vectors })
    }

    /// Build a model from in-memory vectors (normalised like loaded ones).
    pub fn from_vectors<I, S>(width: usize, words: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut vectors = FxHashMap::default();
        for (w, mut v) in words {
            assert_eq!(v.len(), width, "vector width mismatch");
            normalize(&mut v);
            vectors.entry(w.into()).or_insert(v);
        }
        Self { width, vectors }
    }
}

impl EmbeddingModel for TextEmbeddingModel {
    fn vector(&self, token: &str) -> Option<&[f32]> {
        self.vectors.get(token).map(Vec::as_slice)
    }

    fn width(&self) -> usize {
        self.width
    }

    fn vocabulary_size(&self) -> usize {
        self.vectors.len()
    }
}

/// Loaded models keyed by path. Loading a path twice returns the first model.
#[derive(Default, Clone)]
pub struct EmbeddingCache {
    models: FxHashMap<PathBuf, Arc<dyn EmbeddingModel>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> {
        let path = path.as_ref();
        if let Some(m) = self.models.get(path) {
            return Ok(Arc::clone(m));
        }
        let m: Arc<dyn EmbeddingModel> = Arc::new(TextEmbeddingModel::load(path)?);
        self.models.insert(path.to_path_buf(), Arc::clone(&m));
        Ok(m)
    }

    /// Register a model under `path` without reading it from disk.
    pub fn insert(&mut self, path: impl Into<PathBuf>, model: Arc<dyn EmbeddingModel>) {
        self.models.insert(path.into(), model);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<dyn EmbeddingModel>> {
        self.models.get(path.as_ref()).cloned()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}
