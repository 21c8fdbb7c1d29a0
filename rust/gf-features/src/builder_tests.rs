use gf_corpus::{Game, MemoryStore};
use serde_json::json;

use crate::builder::FeatureMatrixBuilder;
use crate::definition::{FeatureError, FeatureSpec};
use crate::set::FeatureSet;
use crate::testutil::{clicked, corpus, extractors, hue, models, pairs, words};

fn set(specs: &[FeatureSpec], order: &[&str]) -> FeatureSet {
    let order: Vec<String> = order.iter().map(|s| s.to_string()).collect();
    FeatureSet::init("colors", &corpus(), &extractors(), specs, &order, &mut models()).unwrap()
}

#[test]
fn token_then_action_composes_into_one_row_per_token_row() {
    let set = set(&[words(), clicked()], &["words", "clicked"]);
    let cache = models();
    let out = FeatureMatrixBuilder::new(&set, &cache)
        .build(&corpus(), &pairs())
        .unwrap();

    assert_eq!(out.name, "colors");
    assert_eq!(out.vocabulary_size, 8);
    let ids: Vec<&str> = out.datums.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["g1_1", "g2_1", "g2_2", "g3_1"]);

    // Empty utterance: START and TERMINAL, each with the clicked colour.
    let d = out.get("g3_1").unwrap();
    assert_eq!((d.game.as_str(), d.round), ("g3", 1));
    assert_eq!(d.matrix.rows(), 2);
    assert_eq!(d.matrix.cols(), 8);
    assert_eq!(
        d.matrix.to_dense(),
        vec![
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        ]
    );

    let rows: Vec<usize> = out.iter().map(|d| d.matrix.rows()).collect();
    assert_eq!(rows, vec![5, 4, 3, 2]);
    assert_eq!(out.rows(), 14);
}

#[test]
fn order_decides_column_placement() {
    let set = set(&[words(), clicked()], &["clicked", "words"]);
    let cache = models();
    let out = FeatureMatrixBuilder::new(&set, &cache)
        .build(&corpus(), &pairs())
        .unwrap();

    let m = out.get("g2_2").unwrap().matrix.to_dense();
    assert_eq!(
        m,
        vec![
            vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        ]
    );
}

#[test]
fn two_sequence_features_multiply_row_counts() {
    let set = set(&[words(), hue()], &["words", "hue"]);
    let cache = models();
    let builder = FeatureMatrixBuilder::new(&set, &cache);
    let out = builder.build(&corpus(), &pairs()).unwrap();

    // 3 x 3 rows for a single-token utterance.
    let m = &out.get("g2_2").unwrap().matrix;
    assert_eq!((m.rows(), m.cols()), (9, 10));
    let w = set.feature("words").unwrap();
    let h = set.feature("hue").unwrap();
    let g = corpus_game(1);
    let ex = &pairs().extract(&g)[1];
    let wm = w.compute(ex.utterance, ex.action, &cache).unwrap();
    let hm = h.compute(ex.utterance, ex.action, &cache).unwrap();
    for i in 0..3 {
        for j in 0..3 {
            let mut expect = wm.row_dense(i);
            expect.extend(hm.row_dense(j));
            assert_eq!(m.row_dense(i * 3 + j), expect);
        }
    }
    assert_eq!(builder.compose(ex.utterance, ex.action).unwrap(), *m);
}

fn corpus_game(i: usize) -> Game {
    use gf_corpus::GameStore;
    corpus().games().nth(i).unwrap().unwrap()
}

fn game(id: &str, color: &str) -> Game {
    serde_json::from_value(json!({"id": id, "rounds": [
        {"round": 1, "events": [
            {"type": "utterance", "sender": "speaker", "sentences": [
                {"tokens": ["blue"], "annotations": {}}]},
            {"type": "action", "sender": "listener", "fields": {"color": color}}
        ]}
    ]}))
    .unwrap()
}

#[test]
fn duplicate_datum_ids_keep_the_last_example() {
    let set = set(&[words(), clicked()], &["words", "clicked"]);
    let cache = models();
    let store = MemoryStore::new(vec![game("g", "blue"), game("g", "red")]);

    let mut seen = Vec::new();
    let out = FeatureMatrixBuilder::new(&set, &cache)
        .build_with_progress(&store, &pairs(), |p| {
            seen.push((p.game.to_string(), p.games_done, p.examples_done))
        })
        .unwrap();

    assert_eq!(out.len(), 1);
    let row = out.get("g_1").unwrap().matrix.row_dense(0);
    assert_eq!(&row[5..], &[0.0, 0.0, 1.0]);
    assert_eq!(seen, vec![("g".to_string(), 1, 1), ("g".to_string(), 2, 2)]);
}

#[test]
fn compute_errors_name_the_example() {
    let set = set(&[words(), hue()], &["words", "hue"]);
    let cache = models();
    // No "color" layer on the utterance.
    let store = MemoryStore::new(vec![game("bad", "blue")]);
    let err = FeatureMatrixBuilder::new(&set, &cache)
        .build(&store, &pairs())
        .unwrap_err();
    assert!(matches!(err, FeatureError::Corpus(_)));
    let msg = err.to_string();
    assert!(msg.contains("bad_1") && msg.contains("hue"), "{msg}");
}
