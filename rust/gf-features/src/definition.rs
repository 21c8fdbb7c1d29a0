//! Feature definitions: vocabulary construction + per-example vectorisation.
//!
//! A [`FeatureDefinition`] is built once from a corpus scan ([`FeatureDefinition::init`])
//! and is then frozen. [`FeatureDefinition::compute`] turns one (utterance, action)
//! example into a [`SparseMatrix`]:
//! - action features produce exactly 1 row;
//! - token-sequence features produce `T + 2` rows for `T` tokens
//!   (START, one row per token, TERMINAL).

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use gf_core::{BiLookup, FrequencyError, FrequencyIndex, SparseError, SparseMatrix, SparseVector};
use gf_corpus::{
    Action, ActionExtractor, AnnotationRef, CorpusError, EmbeddingCache, EmbeddingError,
    GameStore, Utterance, UtteranceExtractor,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{reserved_slots, Symbol, RESERVED_SYMBOL_COUNT};

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("matrix: {0}")]
    Matrix(#[from] SparseError),
    #[error("malformed input ({context}): {msg}")]
    MalformedInput { context: String, msg: String },
    #[error("unknown feature {0:?}")]
    UnknownFeature(String),
    #[error("duplicate feature {0:?}")]
    DuplicateFeature(String),
    #[error("feature order {order:?} must list each declared feature exactly once (declared: {declared:?})")]
    OrderMismatch {
        order: Vec<String>,
        declared: Vec<String>,
    },
    #[error("embedding model {} is not loaded", .0.display())]
    ModelNotLoaded(PathBuf),
    #[error("corpus: {0}")]
    Corpus(#[from] CorpusError),
    #[error("embedding: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("vocabulary for feature {feature:?}: {source}")]
    Vocabulary {
        feature: String,
        #[source]
        source: FrequencyError,
    },
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

impl FeatureError {
    /// Prefix malformed-input context with an enclosing location.
    pub fn within(self, outer: impl AsRef<str>) -> Self {
        match self {
            FeatureError::MalformedInput { context, msg } => FeatureError::MalformedInput {
                context: format!("{}: {context}", outer.as_ref()),
                msg,
            },
            FeatureError::Corpus(e) => FeatureError::Corpus(e.within(outer)),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    ActionScalar,
    ActionEnumerable,
    TokenScalar,
    TokenEnumerable,
    TokenEmbedding,
}

/// How a categorical value becomes columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// One column holding the vocabulary index.
    Index,
    /// Vocabulary-wide indicator columns.
    #[default]
    OneHot,
}

fn default_min_count() -> u64 {
    1
}

/// Kind-specific parameters of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureParams {
    /// Numeric action fields whose key starts with `prefix`.
    ActionScalar {
        #[serde(default)]
        prefix: String,
    },
    /// `key_value` categories of action fields whose key starts with `prefix`.
    ActionEnumerable {
        #[serde(default)]
        prefix: String,
        #[serde(default = "default_min_count")]
        min_count: u64,
        #[serde(default)]
        encoding: Encoding,
    },
    /// Numeric fields of a `{field: number}` token annotation layer.
    TokenScalar { annotation: String },
    /// Categorical values of a token annotation layer.
    TokenEnumerable {
        annotation: String,
        #[serde(default = "default_min_count")]
        min_count: u64,
        #[serde(default)]
        encoding: Encoding,
        #[serde(default)]
        lower_case: bool,
    },
    /// Word vectors of a (lower-cased) token annotation layer.
    TokenEmbedding {
        annotation: String,
        model_file: PathBuf,
    },
}

impl FeatureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKind::ActionScalar => "action_scalar",
            FeatureKind::ActionEnumerable => "action_enumerable",
            FeatureKind::TokenScalar => "token_scalar",
            FeatureKind::TokenEnumerable => "token_enumerable",
            FeatureKind::TokenEmbedding => "token_embedding",
        }
    }
}

impl FeatureParams {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureParams::ActionScalar { .. } => FeatureKind::ActionScalar,
            FeatureParams::ActionEnumerable { .. } => FeatureKind::ActionEnumerable,
            FeatureParams::TokenScalar { .. } => FeatureKind::TokenScalar,
            FeatureParams::TokenEnumerable { .. } => FeatureKind::TokenEnumerable,
            FeatureParams::TokenEmbedding { .. } => FeatureKind::TokenEmbedding,
        }
    }
}

/// A named feature request, as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(flatten)]
    pub params: FeatureParams,
}

/// Which utterances and actions feed vocabulary construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extractors {
    #[serde(default)]
    pub utterances: UtteranceExtractor,
    #[serde(default)]
    pub actions: ActionExtractor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    name: String,
    params: FeatureParams,
    extractors: Extractors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vocabulary: Option<BiLookup>,
    dimensionality: usize,
}

fn malformed(context: String, msg: impl Into<String>) -> FeatureError {
    FeatureError::MalformedInput {
        context,
        msg: msg.into(),
    }
}

fn text_annotation<'a>(a: AnnotationRef<'a>, layer: &str) -> Result<&'a str, FeatureError> {
    match a {
        AnnotationRef::Text(s) => Ok(s),
        AnnotationRef::Fields(_) => Err(malformed(
            format!("layer {layer:?}"),
            "expected a categorical (string) annotation, found numeric fields",
        )),
    }
}

fn fields_annotation<'a>(
    a: AnnotationRef<'a>,
    layer: &str,
) -> Result<&'a BTreeMap<String, f32>, FeatureError> {
    match a {
        AnnotationRef::Fields(f) => Ok(f),
        AnnotationRef::Text(_) => Err(malformed(
            format!("layer {layer:?}"),
            "expected a {field: number} annotation, found a string",
        )),
    }
}

fn normalize_token(s: &str, lower_case: bool) -> String {
    if lower_case {
        s.to_lowercase()
    } else {
        s.to_string()
    }
}

impl FeatureDefinition {
    /// Scan `store` once and freeze the feature's vocabulary and width.
    ///
    /// Embedding features read no corpus; they load `model_file` into `models`.
    pub fn init<S: GameStore + ?Sized>(
        spec: &FeatureSpec,
        store: &S,
        extractors: &Extractors,
        models: &mut EmbeddingCache,
    ) -> Result<Self, FeatureError> {
        let (vocabulary, dimensionality) = match &spec.params {
            FeatureParams::ActionScalar { prefix } => {
                let mut c = FrequencyIndex::new();
                scan_actions(store, &extractors.actions, |a| {
                    for (key, value) in &a.fields {
                        if key.starts_with(prefix.as_str()) && value.as_scalar().is_some() {
                            c.increment(key);
                        }
                    }
                    Ok(())
                })?;
                let vocab = BiLookup::from_index(c.build_index());
                let n = vocab.len();
                (Some(vocab), n)
            }
            FeatureParams::ActionEnumerable {
                prefix,
                min_count,
                encoding,
            } => {
                let mut c = FrequencyIndex::new();
                scan_actions(store, &extractors.actions, |a| {
                    for (key, value) in a.fields.iter().filter(|(k, _)| k.starts_with(prefix.as_str())) {
                        c.increment(&format!("{key}_{value}"));
                    }
                    Ok(())
                })?;
                c.remove_less_than(*min_count);
                let vocab = BiLookup::from_index(c.build_index());
                let n = match encoding {
                    Encoding::Index => 1,
                    Encoding::OneHot => vocab.len(),
                };
                (Some(vocab), n)
            }
            FeatureParams::TokenScalar { annotation } => {
                let mut c = FrequencyIndex::new();
                scan_utterances(store, &extractors.utterances, |u| {
                    for a in u.annotation_layer(annotation)? {
                        for field in fields_annotation(a, annotation)?.keys() {
                            c.increment(field);
                        }
                    }
                    Ok(())
                })?;
                let vocab = sequence_vocabulary(&spec.name, c)?;
                let n = vocab.len();
                (Some(vocab), n)
            }
            FeatureParams::TokenEnumerable {
                annotation,
                min_count,
                encoding,
                lower_case,
            } => {
                let mut c = FrequencyIndex::new();
                scan_utterances(store, &extractors.utterances, |u| {
                    for a in u.annotation_layer(annotation)? {
                        let token = text_annotation(a, annotation)?;
                        c.increment(&normalize_token(token, *lower_case));
                    }
                    Ok(())
                })?;
                c.remove_less_than(*min_count);
                let vocab = sequence_vocabulary(&spec.name, c)?;
                let n = match encoding {
                    Encoding::Index => 1,
                    Encoding::OneHot => vocab.len(),
                };
                (Some(vocab), n)
            }
            FeatureParams::TokenEmbedding { model_file, .. } => {
                let model = models.load(model_file)?;
                (None, model.width() + RESERVED_SYMBOL_COUNT)
            }
        };

        Ok(Self {
            name: spec.name.clone(),
            params: spec.params.clone(),
            extractors: extractors.clone(),
            vocabulary,
            dimensionality,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FeatureKind {
        self.params.kind()
    }

    pub fn params(&self) -> &FeatureParams {
        &self.params
    }

    pub fn extractors(&self) -> &Extractors {
        &self.extractors
    }

    pub fn vocabulary(&self) -> Option<&BiLookup> {
        self.vocabulary.as_ref()
    }

    /// Column count of every row this feature computes.
    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    pub fn is_sequence(&self) -> bool {
        matches!(
            self.kind(),
            FeatureKind::TokenScalar | FeatureKind::TokenEnumerable | FeatureKind::TokenEmbedding
        )
    }

    /// Encoding of categorical features; `None` for scalar and embedding kinds.
    pub fn encoding(&self) -> Option<Encoding> {
        match &self.params {
            FeatureParams::ActionEnumerable { encoding, .. }
            | FeatureParams::TokenEnumerable { encoding, .. } => Some(*encoding),
            _ => None,
        }
    }

    /// Vocabulary key of local column `index`, if the column has one.
    ///
    /// Index-encoded columns hold ordinals, not one key, so they have none.
    pub fn column_key(&self, index: usize) -> Option<&str> {
        if self.encoding() == Some(Encoding::Index) {
            return None;
        }
        self.vocabulary.as_ref()?.get_reverse(index)
    }

    /// Embedding model file this feature needs at compute time.
    pub fn model_file(&self) -> Option<&Path> {
        match &self.params {
            FeatureParams::TokenEmbedding { model_file, .. } => Some(model_file.as_path()),
            _ => None,
        }
    }

    /// Vectorise one example.
    pub fn compute(
        &self,
        utterance: &Utterance,
        action: &Action,
        models: &EmbeddingCache,
    ) -> Result<SparseMatrix, FeatureError> {
        let r = match &self.params {
            FeatureParams::ActionScalar { .. } => self.compute_action_scalar(action),
            FeatureParams::ActionEnumerable { encoding, .. } => {
                self.compute_action_enumerable(action, *encoding)
            }
            FeatureParams::TokenScalar { annotation } => {
                self.compute_token_scalar(utterance, annotation)
            }
            FeatureParams::TokenEnumerable {
                annotation,
                encoding,
                lower_case,
                ..
            } => self.compute_token_enumerable(utterance, annotation, *encoding, *lower_case),
            FeatureParams::TokenEmbedding {
                annotation,
                model_file,
            } => self.compute_token_embedding(utterance, annotation, model_file, models),
        };
        r.map_err(|e| e.within(format!("feature {:?}", self.name)))
    }

    fn vocab(&self) -> Result<&BiLookup, FeatureError> {
        self.vocabulary
            .as_ref()
            .ok_or_else(|| malformed("definition".to_string(), "feature has no vocabulary"))
    }

    fn single_row(&self, v: SparseVector) -> Result<SparseMatrix, FeatureError> {
        let mut m = SparseMatrix::new(self.dimensionality);
        m.push_row(&v)?;
        Ok(m)
    }

    fn compute_action_scalar(&self, action: &Action) -> Result<SparseMatrix, FeatureError> {
        let vocab = self.vocab()?;
        let mut v = SparseVector::new(self.dimensionality);
        for (key, value) in &action.fields {
            if let Some(index) = vocab.get(key) {
                let x = value.as_scalar().ok_or_else(|| {
                    malformed(format!("action field {key:?}"), format!("{value:?} is not numeric"))
                })?;
                v.set(index, x);
            }
        }
        self.single_row(v)
    }

    fn compute_action_enumerable(
        &self,
        action: &Action,
        encoding: Encoding,
    ) -> Result<SparseMatrix, FeatureError> {
        let vocab = self.vocab()?;
        let mut v = SparseVector::new(self.dimensionality);
        for (key, value) in &action.fields {
            if let Some(index) = vocab.get(&format!("{key}_{value}")) {
                set_category(&mut v, encoding, index);
            }
        }
        self.single_row(v)
    }

    /// START row, `token_row` for each token, TERMINAL row.
    fn sequence<F>(
        &self,
        utterance: &Utterance,
        annotation: &str,
        encoding: Encoding,
        mut token_row: F,
    ) -> Result<SparseMatrix, FeatureError>
    where
        F: FnMut(AnnotationRef<'_>, &mut SparseVector) -> Result<(), FeatureError>,
    {
        let tokens = utterance.annotation_layer(annotation)?;
        let width = self.dimensionality;
        let mut m = SparseMatrix::new(width);

        let mut start = SparseVector::new(width);
        set_category(&mut start, encoding, Symbol::Start.index());
        m.push_row(&start)?;

        for a in tokens {
            let mut v = SparseVector::new(width);
            token_row(a, &mut v)?;
            m.push_row(&v)?;
        }

        let mut end = SparseVector::new(width);
        set_category(&mut end, encoding, Symbol::Terminal.index());
        m.push_row(&end)?;
        Ok(m)
    }

    fn compute_token_scalar(
        &self,
        utterance: &Utterance,
        annotation: &str,
    ) -> Result<SparseMatrix, FeatureError> {
        let vocab = self.vocab()?;
        self.sequence(utterance, annotation, Encoding::OneHot, |a, v| {
            for (field, &x) in fields_annotation(a, annotation)? {
                if let Some(index) = vocab.get(field) {
                    if !x.is_finite() {
                        return Err(malformed(
                            format!("annotation {annotation:?} field {field:?}"),
                            format!("{x} is not finite"),
                        ));
                    }
                    v.set(index, x);
                }
            }
            Ok(())
        })
    }

    fn compute_token_enumerable(
        &self,
        utterance: &Utterance,
        annotation: &str,
        encoding: Encoding,
        lower_case: bool,
    ) -> Result<SparseMatrix, FeatureError> {
        let vocab = self.vocab()?;
        self.sequence(utterance, annotation, encoding, |a, v| {
            let token = normalize_token(text_annotation(a, annotation)?, lower_case);
            let index = vocab.get(&token).unwrap_or(Symbol::Missing.index());
            set_category(v, encoding, index);
            Ok(())
        })
    }

    fn compute_token_embedding(
        &self,
        utterance: &Utterance,
        annotation: &str,
        model_file: &Path,
        models: &EmbeddingCache,
    ) -> Result<SparseMatrix, FeatureError> {
        let model = models
            .get(model_file)
            .ok_or_else(|| FeatureError::ModelNotLoaded(model_file.to_path_buf()))?;
        let width = model.width() + RESERVED_SYMBOL_COUNT;
        if width != self.dimensionality {
            return Err(SparseError::DimensionMismatch {
                expected: self.dimensionality,
                got: width,
            }
            .into());
        }

        self.sequence(utterance, annotation, Encoding::OneHot, |a, v| {
            let token = text_annotation(a, annotation)?.to_lowercase();
            match model.vector(&token) {
                Some(values) => {
                    for (i, &x) in values.iter().enumerate() {
                        v.set(RESERVED_SYMBOL_COUNT + i, x);
                    }
                }
                None => v.set(Symbol::Missing.index(), 1.0),
            }
            Ok(())
        })
    }
}

fn set_category(v: &mut SparseVector, encoding: Encoding, index: usize) {
    match encoding {
        Encoding::OneHot => v.set(index, 1.0),
        Encoding::Index => v.set(0, index as f32),
    }
}

/// Add the reserved symbols and pin them to their fixed slots.
fn sequence_vocabulary(feature: &str, mut c: FrequencyIndex) -> Result<BiLookup, FeatureError> {
    for s in Symbol::ALL {
        c.increment(s.key());
    }
    let index = c
        .build_index_pinned(&reserved_slots())
        .map_err(|source| FeatureError::Vocabulary {
            feature: feature.to_string(),
            source,
        })?;
    Ok(BiLookup::from_index(index))
}

fn scan_actions<S, F>(store: &S, extractor: &ActionExtractor, mut f: F) -> Result<(), FeatureError>
where
    S: GameStore + ?Sized,
    F: FnMut(&Action) -> Result<(), FeatureError>,
{
    for game in store.games() {
        let game = game?;
        for a in extractor.extract(&game) {
            f(a).map_err(|e| e.within(format!("game {:?}", game.id)))?;
        }
    }
    Ok(())
}

fn scan_utterances<S, F>(
    store: &S,
    extractor: &UtteranceExtractor,
    mut f: F,
) -> Result<(), FeatureError>
where
    S: GameStore + ?Sized,
    F: FnMut(&Utterance) -> Result<(), FeatureError>,
{
    for game in store.games() {
        let game = game?;
        for u in extractor.extract(&game) {
            f(u).map_err(|e| e.within(format!("game {:?}", game.id)))?;
        }
    }
    Ok(())
}
