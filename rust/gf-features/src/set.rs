//! Feature sets: ordered feature definitions with a fixed column layout.
//!
//! The `order` list is authoritative: feature `order[k]` owns the columns
//! `[Σ_{j<k} dim(order[j]), Σ_{j<=k} dim(order[j]))` of every composite row, and
//! composition folds features in that order.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use gf_corpus::{EmbeddingCache, GameStore};
use serde::{Deserialize, Serialize};

use crate::definition::{Extractors, FeatureDefinition, FeatureError, FeatureSpec};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    name: String,
    extractors: Extractors,
    order: Vec<String>,
    features: BTreeMap<String, FeatureDefinition>,
    dimensionality: usize,
}

/// Root metadata document of a saved feature set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSetMeta {
    pub name: String,
    pub extractors: Extractors,
    pub order: Vec<String>,
    pub dimensionality: usize,
}

fn check_order<'a>(
    declared: impl IntoIterator<Item = &'a str>,
    order: &[String],
) -> Result<(), FeatureError> {
    let declared: BTreeSet<&str> = declared.into_iter().collect();
    let listed: BTreeSet<&str> = order.iter().map(String::as_str).collect();
    if listed.len() != order.len() || listed != declared {
        return Err(FeatureError::OrderMismatch {
            order: order.to_vec(),
            declared: declared.into_iter().map(str::to_string).collect(),
        });
    }
    Ok(())
}

impl FeatureSet {
    /// Build every definition in `specs` from one corpus and fix the layout.
    pub fn init<S: GameStore + ?Sized>(
        name: &str,
        store: &S,
        extractors: &Extractors,
        specs: &[FeatureSpec],
        order: &[String],
        models: &mut EmbeddingCache,
    ) -> Result<Self, FeatureError> {
        let mut seen = BTreeSet::new();
        for s in specs {
            if !seen.insert(s.name.as_str()) {
                return Err(FeatureError::DuplicateFeature(s.name.clone()));
            }
        }
        check_order(seen.iter().copied(), order)?;

        let mut features = BTreeMap::new();
        for s in specs {
            let f = FeatureDefinition::init(s, store, extractors, models)?;
            features.insert(s.name.clone(), f);
        }
        let dimensionality = features.values().map(FeatureDefinition::dimensionality).sum();

        Ok(Self {
            name: name.to_string(),
            extractors: extractors.clone(),
            order: order.to_vec(),
            features,
            dimensionality,
        })
    }

    /// Reassemble a set from its metadata and definitions (e.g. after loading).
    pub fn from_parts(
        meta: FeatureSetMeta,
        definitions: Vec<FeatureDefinition>,
    ) -> Result<Self, FeatureError> {
        let mut features = BTreeMap::new();
        for d in definitions {
            let name = d.name().to_string();
            if features.insert(name.clone(), d).is_some() {
                return Err(FeatureError::DuplicateFeature(name));
            }
        }
        check_order(features.keys().map(String::as_str), &meta.order)?;

        let dimensionality: usize = features.values().map(FeatureDefinition::dimensionality).sum();
        if dimensionality != meta.dimensionality {
            return Err(FeatureError::MalformedInput {
                context: format!("feature set {:?}", meta.name),
                msg: format!(
                    "metadata dimensionality {} does not match its features ({dimensionality})",
                    meta.dimensionality
                ),
            });
        }

        Ok(Self {
            name: meta.name,
            extractors: meta.extractors,
            order: meta.order,
            features,
            dimensionality,
        })
    }

    pub fn meta(&self) -> FeatureSetMeta {
        FeatureSetMeta {
            name: self.name.clone(),
            extractors: self.extractors.clone(),
            order: self.order.clone(),
            dimensionality: self.dimensionality,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extractors(&self) -> &Extractors {
        &self.extractors
    }

    /// Total column count of a composite row.
    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureDefinition> {
        self.features.get(name)
    }

    /// Definitions in composition order.
    pub fn features(&self) -> impl Iterator<Item = &FeatureDefinition> {
        self.order.iter().filter_map(|n| self.features.get(n))
    }

    pub fn feature_dimensionality(&self, name: &str) -> Option<usize> {
        self.feature(name).map(FeatureDefinition::dimensionality)
    }

    /// Columns `[start, end)` owned by `name` in a composite row.
    pub fn feature_range(&self, name: &str) -> Option<Range<usize>> {
        let mut offset = 0;
        for f in self.features() {
            if f.name() == name {
                return Some(offset..offset + f.dimensionality());
            }
            offset += f.dimensionality();
        }
        None
    }

    /// Feature owning global column `index`, and the column's local index.
    pub fn column_owner(&self, index: usize) -> Option<(&FeatureDefinition, usize)> {
        let mut offset = 0;
        for f in self.features() {
            if index < offset + f.dimensionality() {
                return Some((f, index - offset));
            }
            offset += f.dimensionality();
        }
        None
    }

    /// Vocabulary key behind global column `index`.
    ///
    /// `None` past the last column and for columns without a vocabulary key
    /// (embedding features).
    pub fn column_key(&self, index: usize) -> Option<&str> {
        let (f, local) = self.column_owner(index)?;
        f.column_key(local)
    }

    pub fn column_keys(&self, indices: &[usize]) -> Vec<Option<&str>> {
        indices.iter().map(|&i| self.column_key(i)).collect()
    }

    /// The slice of a dense composite row that belongs to `name`.
    pub fn slice_feature<'r>(&self, row: &'r [f32], name: &str) -> Option<&'r [f32]> {
        let r = self.feature_range(name)?;
        row.get(r)
    }

    /// Load every embedding model the set references into `models`.
    pub fn ensure_models(&self, models: &mut EmbeddingCache) -> Result<(), FeatureError> {
        for f in self.features() {
            if let Some(path) = f.model_file() {
                models.load(path)?;
            }
        }
        Ok(())
    }
}
