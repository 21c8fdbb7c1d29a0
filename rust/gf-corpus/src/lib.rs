//! gf-corpus: game-record corpus access and external word embeddings.
//!
//! - [`game`]: the JSON game-record model (rounds, utterances, actions, token annotations)
//! - [`store`]: [`GameStore`] implementations over a directory of records or memory
//! - [`extract`]: enumerated extractors selecting utterances, actions, and examples
//! - [`embedding`]: word2vec text models and an explicit per-pipeline model cache

pub mod embedding;
pub mod extract;
pub mod game;
pub mod store;

pub use embedding::{EmbeddingCache, EmbeddingError, EmbeddingModel, TextEmbeddingModel};
pub use extract::{ActionExtractor, Example, PairExtractor, UtteranceExtractor};
pub use game::{
    Action, ActionValue, Annotation, AnnotationRef, Event, Game, Round, Sentence, Utterance,
    TOKENS_LAYER,
};
pub use store::{CorpusError, GameStore, JsonDirStore, MemoryStore};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod store_tests;
