//! Game-record model.
//!
//! A game is a list of rounds; each round is an ordered list of events, either
//! an utterance (tokenised sentences with per-token annotation layers) or an
//! action (a flat map of named parameters).
//!
//! ```json
//! {"id": "g7", "rounds": [{"round": 1, "events": [
//!   {"type": "utterance", "sender": "speaker", "sentences": [
//!     {"tokens": ["the", "Blue", "one"],
//!      "annotations": {"lemmas": ["the", "blue", "one"],
//!                      "color": [{}, {"hue": 0.6}, {}]}}]},
//!   {"type": "action", "sender": "listener", "fields": {"clickX": 120, "clickColor": "blue"}}
//! ]}]}
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::CorpusError;

/// Layer name that resolves to a sentence's raw tokens when no annotation layer
/// of that name exists.
pub const TOKENS_LAYER: &str = "tokens";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    #[serde(default)]
    pub rounds: Vec<Round>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub round: u32,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Utterance(Utterance),
    Action(Action),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub tokens: Vec<String>,
    /// Annotation layers, each one value per token.
    #[serde(default)]
    pub annotations: BTreeMap<String, Vec<Annotation>>,
}

/// One token's value in an annotation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Annotation {
    /// Categorical value (lemma, POS tag, ...).
    Text(String),
    /// Named numeric fields.
    Fields(BTreeMap<String, f32>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnnotationRef<'a> {
    Text(&'a str),
    Fields(&'a BTreeMap<String, f32>),
}

impl<'a> From<&'a Annotation> for AnnotationRef<'a> {
    fn from(a: &'a Annotation) -> Self {
        match a {
            Annotation::Text(s) => AnnotationRef::Text(s),
            Annotation::Fields(f) => AnnotationRef::Fields(f),
        }
    }
}

impl Utterance {
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn token_count(&self) -> usize {
        self.sentences.iter().map(|s| s.tokens.len()).sum()
    }

    /// `layer` values for every token, sentence by sentence.
    ///
    /// Fails if a sentence lacks the layer or the layer is shorter than its
    /// token list. [`TOKENS_LAYER`] falls back to the raw tokens.
    pub fn annotation_layer<'a>(
        &'a self,
        layer: &str,
    ) -> Result<Vec<AnnotationRef<'a>>, CorpusError> {
        let mut out = Vec::with_capacity(self.token_count());
        for (i, s) in self.sentences.iter().enumerate() {
            match s.annotations.get(layer) {
                Some(values) => {
                    if values.len() < s.tokens.len() {
                        return Err(CorpusError::MalformedInput {
                            context: format!("sentence {i}"),
                            msg: format!(
                                "annotation layer {layer:?} has {} values for {} tokens",
                                values.len(),
                                s.tokens.len()
                            ),
                        });
                    }
                    out.extend(values[..s.tokens.len()].iter().map(AnnotationRef::from));
                }
                None if layer == TOKENS_LAYER => {
                    out.extend(s.tokens.iter().map(|t| AnnotationRef::Text(t)));
                }
                None => {
                    return Err(CorpusError::MalformedInput {
                        context: format!("sentence {i}"),
                        msg: format!("missing annotation layer {layer:?}"),
                    });
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub fields: BTreeMap<String, ActionValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ActionValue {
    /// Numeric reading of the value: numbers as-is, booleans as 1/0, numeric strings parsed.
    ///
    /// Values that are not finite as `f32` (`"NaN"`, `"inf"`, `1e300`) do not read as numbers.
    pub fn as_scalar(&self) -> Option<f32> {
        let x = match self {
            ActionValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ActionValue::Number(x) => Some(*x as f32),
            ActionValue::Text(s) => s.trim().parse::<f32>().ok(),
        }?;
        x.is_finite().then_some(x)
    }
}

impl fmt::Display for ActionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionValue::Bool(b) => write!(f, "{b}"),
            ActionValue::Number(x) => write!(f, "{x}"),
            ActionValue::Text(s) => f.write_str(s),
        }
    }
}

impl Round {
    pub fn utterances(&self) -> impl Iterator<Item = &Utterance> {
        self.events.iter().filter_map(|e| match e {
            Event::Utterance(u) => Some(u),
            Event::Action(_) => None,
        })
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.events.iter().filter_map(|e| match e {
            Event::Action(a) => Some(a),
            Event::Utterance(_) => None,
        })
    }
}
