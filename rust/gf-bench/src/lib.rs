//! gf-bench: deterministic corpora and matrices for the criterion benches.

use std::collections::BTreeMap;
use std::sync::Arc;

use gf_core::{SparseMatrix, SparseVector};
use gf_corpus::{
    Action, ActionValue, Annotation, EmbeddingCache, Event, Game, MemoryStore, Round, Sentence,
    TextEmbeddingModel, Utterance,
};
use gf_features::{Encoding, FeatureParams, FeatureSpec};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const MODEL_PATH: &str = "mem://bench-vectors";

const COLORS: [&str; 6] = ["red", "green", "blue", "teal", "plum", "gold"];

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

fn word(i: usize) -> String {
    format!("w{i}")
}

/// `games` games of `rounds` rounds; each round is a speaker utterance of
/// `tokens` words drawn from a `vocab`-word lexicon, then a listener click.
pub fn gen_games(games: usize, rounds: usize, tokens: usize, vocab: usize) -> Vec<Game> {
    let mut rng = Lcg(0xA5A5_A5A5_0123_4567);
    (0..games)
        .map(|g| Game {
            id: format!("g{g:05}"),
            rounds: (0..rounds)
                .map(|r| {
                    let words: Vec<String> = (0..tokens).map(|_| word(rng.below(vocab))).collect();
                    let pos: Vec<Annotation> = words
                        .iter()
                        .map(|_| Annotation::Text(["NN", "JJ", "DT"][rng.below(3)].to_string()))
                        .collect();
                    let utterance = Utterance {
                        sender: "speaker".to_string(),
                        sentences: vec![Sentence {
                            tokens: words,
                            annotations: BTreeMap::from([("pos".to_string(), pos)]),
                        }],
                    };
                    let action = Action {
                        sender: "listener".to_string(),
                        fields: BTreeMap::from([
                            (
                                "color".to_string(),
                                ActionValue::Text(COLORS[rng.below(COLORS.len())].to_string()),
                            ),
                            ("x".to_string(), ActionValue::Number(rng.below(100) as f64)),
                        ]),
                    };
                    Round {
                        round: r as u32 + 1,
                        events: vec![Event::Utterance(utterance), Event::Action(action)],
                    }
                })
                .collect(),
        })
        .collect()
}

pub fn gen_store(games: usize, rounds: usize, tokens: usize, vocab: usize) -> MemoryStore {
    MemoryStore::new(gen_games(games, rounds, tokens, vocab))
}

/// An embedding model covering every lexicon word, registered under [`MODEL_PATH`].
pub fn gen_models(vocab: usize, width: usize) -> EmbeddingCache {
    let mut rng = Lcg(0x0123_4567_89AB_CDEF);
    let words: Vec<(String, Vec<f32>)> = (0..vocab)
        .map(|i| {
            let v = (0..width).map(|_| rng.below(1000) as f32 / 1000.0 + 0.001).collect();
            (word(i), v)
        })
        .collect();
    let mut cache = EmbeddingCache::new();
    cache.insert(MODEL_PATH, Arc::new(TextEmbeddingModel::from_vectors(width, words)));
    cache
}

/// `rows` x `cols` matrix with `per_row` stored entries in each row.
pub fn gen_matrix(rows: usize, cols: usize, per_row: usize) -> SparseMatrix {
    let mut rng = Lcg(0xDEAD_BEEF);
    let mut m = SparseMatrix::new(cols);
    for _ in 0..rows {
        let mut v = SparseVector::new(cols);
        for _ in 0..per_row {
            v.set(rng.below(cols), 1.0);
        }
        // Width always matches.
        let _ = m.push_row(&v);
    }
    m
}

/// Word one-hot, POS one-hot, word vectors and the clicked colour.
pub fn feature_specs() -> Vec<FeatureSpec> {
    vec![
        FeatureSpec {
            name: "words".to_string(),
            params: FeatureParams::TokenEnumerable {
                annotation: "tokens".to_string(),
                min_count: 1,
                encoding: Encoding::OneHot,
                lower_case: true,
            },
        },
        FeatureSpec {
            name: "pos".to_string(),
            params: FeatureParams::TokenEnumerable {
                annotation: "pos".to_string(),
                min_count: 1,
                encoding: Encoding::Index,
                lower_case: false,
            },
        },
        FeatureSpec {
            name: "vectors".to_string(),
            params: FeatureParams::TokenEmbedding {
                annotation: "tokens".to_string(),
                model_file: MODEL_PATH.into(),
            },
        },
        FeatureSpec {
            name: "clicked".to_string(),
            params: FeatureParams::ActionEnumerable {
                prefix: "color".to_string(),
                min_count: 1,
                encoding: Encoding::OneHot,
            },
        },
    ]
}
