use std::sync::Arc;

use gf_corpus::{
    ActionExtractor, EmbeddingCache, Game, MemoryStore, PairExtractor, TextEmbeddingModel,
    UtteranceExtractor,
};
use serde_json::json;

use crate::definition::{Encoding, Extractors, FeatureParams, FeatureSpec};

pub const MODEL_PATH: &str = "mem://vectors";

/// Three games, four rounds. Speaker utterances carry `pos` and `color` layers;
/// listener actions carry `color` and `x`. The last round has an empty utterance.
pub fn corpus() -> MemoryStore {
    let games = vec![
        json!({"id": "g1", "rounds": [
            {"round": 1, "events": [
                {"type": "utterance", "sender": "speaker", "sentences": [
                    {"tokens": ["the", "blue", "one"], "annotations": {
                        "pos": ["DT", "JJ", "NN"],
                        "color": [{}, {"hue": 0.5}, {}]}}]},
                {"type": "utterance", "sender": "listener", "sentences": [
                    {"tokens": ["ok"], "annotations": {}}]},
                {"type": "action", "sender": "listener", "fields": {"color": "blue", "x": 3}}
            ]}
        ]}),
        json!({"id": "g2", "rounds": [
            {"round": 1, "events": [
                {"type": "utterance", "sender": "speaker", "sentences": [
                    {"tokens": ["Blue", "one"], "annotations": {
                        "pos": ["JJ", "NN"],
                        "color": [{"hue": 0.6, "sat": 1}, {}]}}]},
                {"type": "action", "sender": "listener", "fields": {"color": "green", "x": 5}}
            ]},
            {"round": 2, "events": [
                {"type": "utterance", "sender": "speaker", "sentences": [
                    {"tokens": ["red"], "annotations": {
                        "pos": ["JJ"],
                        "color": [{"hue": 0.1}]}}]},
                {"type": "action", "sender": "listener", "fields": {"color": "red", "x": 1}}
            ]}
        ]}),
        json!({"id": "g3", "rounds": [
            {"round": 1, "events": [
                {"type": "utterance", "sender": "speaker", "sentences": [
                    {"tokens": [], "annotations": {"pos": [], "color": []}}]},
                {"type": "action", "sender": "listener", "fields": {"color": "blue", "x": 2}}
            ]}
        ]}),
    ];
    MemoryStore::new(
        games
            .into_iter()
            .map(|g| serde_json::from_value::<Game>(g).unwrap())
            .collect(),
    )
}

/// Speaker utterances, listener actions.
pub fn extractors() -> Extractors {
    Extractors {
        utterances: UtteranceExtractor::Sender {
            sender: "speaker".to_string(),
        },
        actions: ActionExtractor::Sender {
            sender: "listener".to_string(),
        },
    }
}

pub fn pairs() -> PairExtractor {
    PairExtractor::UtteranceThenAction {
        utterance_sender: Some("speaker".to_string()),
        action_sender: Some("listener".to_string()),
    }
}

pub fn models() -> EmbeddingCache {
    let mut cache = EmbeddingCache::new();
    let m = TextEmbeddingModel::from_vectors(
        2,
        [("blue", vec![3.0, 4.0]), ("one", vec![0.0, 2.0]), ("the", vec![1.0, 0.0])],
    );
    cache.insert(MODEL_PATH, Arc::new(m));
    cache
}

/// Lower-cased tokens seen at least twice: `blue` and `one`. Width 5.
pub fn words() -> FeatureSpec {
    FeatureSpec {
        name: "words".to_string(),
        params: FeatureParams::TokenEnumerable {
            annotation: "tokens".to_string(),
            min_count: 2,
            encoding: Encoding::OneHot,
            lower_case: true,
        },
    }
}

/// `color_blue`, `color_green`, `color_red`. Width 3.
pub fn clicked() -> FeatureSpec {
    FeatureSpec {
        name: "clicked".to_string(),
        params: FeatureParams::ActionEnumerable {
            prefix: "color".to_string(),
            min_count: 1,
            encoding: Encoding::OneHot,
        },
    }
}

pub fn hue() -> FeatureSpec {
    FeatureSpec {
        name: "hue".to_string(),
        params: FeatureParams::TokenScalar {
            annotation: "color".to_string(),
        },
    }
}

pub fn vectors() -> FeatureSpec {
    FeatureSpec {
        name: "vectors".to_string(),
        params: FeatureParams::TokenEmbedding {
            annotation: "tokens".to_string(),
            model_file: MODEL_PATH.into(),
        },
    }
}
