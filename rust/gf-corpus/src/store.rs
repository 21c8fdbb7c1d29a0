//! Game stores: where game records come from.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::game::Game;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("io ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed input ({context}): {msg}")]
    MalformedInput { context: String, msg: String },
    #[error("no games in {0}")]
    Empty(String),
}

impl CorpusError {
    /// Prefix the error context with an enclosing location (file, game, round).
    pub fn within(self, outer: impl AsRef<str>) -> Self {
        match self {
            CorpusError::MalformedInput { context, msg } => CorpusError::MalformedInput {
                context: format!("{}: {context}", outer.as_ref()),
                msg,
            },
            other => other,
        }
    }
}

/// Source of game records, iterated synchronously in a stable order.
pub trait GameStore {
    /// Every game in the store.
    fn games(&self) -> Box<dyn Iterator<Item = Result<Game, CorpusError>> + '_>;

    /// Human-readable location used in error messages and logs.
    fn describe(&self) -> String;

    /// The first game in the store.
    fn read_one_game(&self) -> Result<Game, CorpusError> {
        self.games()
            .next()
            .unwrap_or_else(|| Err(CorpusError::Empty(self.describe())))
    }
}

/// A directory of `*.json` game records, read in file-name order.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl JsonDirStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(CorpusError::NotFound(dir.to_path_buf()));
        }
        let io_err = |source| CorpusError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let p = entry.map_err(io_err)?.path();
            if p.is_file() && p.extension().is_some_and(|e| e == "json") {
                files.push(p);
            }
        }
        files.sort();
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn read_game(path: &Path) -> Result<Game, CorpusError> {
        let bytes = fs::read(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| CorpusError::MalformedInput {
            context: path.display().to_string(),
            msg: e.to_string(),
        })
    }
}

impl GameStore for JsonDirStore {
    fn games(&self) -> Box<dyn Iterator<Item = Result<Game, CorpusError>> + '_> {
        Box::new(self.files.iter().map(|p| Self::read_game(p)))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Games held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    games: Vec<Game>,
}

impl MemoryStore {
    pub fn new(games: Vec<Game>) -> Self {
        Self { games }
    }
}

impl GameStore for MemoryStore {
    fn games(&self) -> Box<dyn Iterator<Item = Result<Game, CorpusError>> + '_> {
        Box::new(self.games.iter().cloned().map(Ok))
    }

    fn describe(&self) -> String {
        format!("<memory: {} games>", self.games.len())
    }
}
