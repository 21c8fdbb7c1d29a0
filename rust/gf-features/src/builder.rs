//! Per-example composite matrices and the batch pass that produces them.

use std::collections::BTreeMap;

use gf_core::{row_product_cat, SparseMatrix};
use gf_corpus::{Action, EmbeddingCache, GameStore, PairExtractor, Utterance};
use serde::{Deserialize, Serialize};

use crate::definition::FeatureError;
use crate::set::FeatureSet;

/// One example's composite matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    pub id: String,
    pub game: String,
    pub round: u32,
    pub matrix: SparseMatrix,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrixCollection {
    pub name: String,
    pub vocabulary_size: usize,
    pub datums: BTreeMap<String, Datum>,
}

impl FeatureMatrixCollection {
    pub fn new(name: impl Into<String>, vocabulary_size: usize) -> Self {
        Self {
            name: name.into(),
            vocabulary_size,
            datums: BTreeMap::new(),
        }
    }

    /// Store `datum` under its id. An existing datum with the same id is replaced and returned.
    pub fn insert(&mut self, datum: Datum) -> Option<Datum> {
        self.datums.insert(datum.id.clone(), datum)
    }

    pub fn get(&self, id: &str) -> Option<&Datum> {
        self.datums.get(id)
    }

    pub fn len(&self) -> usize {
        self.datums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datums.is_empty()
    }

    /// Datums in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Datum> {
        self.datums.values()
    }

    /// Total row count across all datums.
    pub fn rows(&self) -> usize {
        self.datums.values().map(|d| d.matrix.rows()).sum()
    }
}

/// Progress snapshot reported after each game of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildProgress<'a> {
    pub game: &'a str,
    pub games_done: u64,
    pub examples_done: u64,
}

pub struct FeatureMatrixBuilder<'a> {
    set: &'a FeatureSet,
    models: &'a EmbeddingCache,
}

impl<'a> FeatureMatrixBuilder<'a> {
    /// `models` must already hold every model the set references
    /// (see [`FeatureSet::ensure_models`]).
    pub fn new(set: &'a FeatureSet, models: &'a EmbeddingCache) -> Self {
        Self { set, models }
    }

    pub fn set(&self) -> &FeatureSet {
        self.set
    }

    /// Cartesian composition of every feature's matrix, in set order.
    ///
    /// Row count is the product of the per-feature row counts; width is the
    /// set's dimensionality.
    pub fn compose(
        &self,
        utterance: &Utterance,
        action: &Action,
    ) -> Result<SparseMatrix, FeatureError> {
        let mut acc = SparseMatrix::unit();
        for f in self.set.features() {
            let m = f.compute(utterance, action, self.models)?;
            acc = row_product_cat(&acc, &m);
        }
        Ok(acc)
    }

    pub fn build<S: GameStore + ?Sized>(
        &self,
        store: &S,
        pairs: &PairExtractor,
    ) -> Result<FeatureMatrixCollection, FeatureError> {
        self.build_with_progress(store, pairs, |_| {})
    }

    /// Like [`Self::build`], calling `progress` once per game.
    pub fn build_with_progress<S, F>(
        &self,
        store: &S,
        pairs: &PairExtractor,
        mut progress: F,
    ) -> Result<FeatureMatrixCollection, FeatureError>
    where
        S: GameStore + ?Sized,
        F: FnMut(BuildProgress<'_>),
    {
        let mut out = FeatureMatrixCollection::new(self.set.name(), self.set.dimensionality());
        let mut games_done = 0u64;
        let mut examples_done = 0u64;

        for game in store.games() {
            let game = game?;
            for ex in pairs.extract(&game) {
                let id = ex.id();
                let matrix = self
                    .compose(ex.utterance, ex.action)
                    .map_err(|e| e.within(format!("example {id:?}")))?;
                out.insert(Datum {
                    id,
                    game: ex.game.to_string(),
                    round: ex.round,
                    matrix,
                });
                examples_done += 1;
            }
            games_done += 1;
            progress(BuildProgress {
                game: &game.id,
                games_done,
                examples_done,
            });
        }
        Ok(out)
    }
}
