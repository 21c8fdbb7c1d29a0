use std::fs;

use crate::game::AnnotationRef;
use crate::{ActionValue, CorpusError, Event, Game, GameStore, JsonDirStore, MemoryStore};

const GAME_JSON: &str = r#"{
  "id": "g1",
  "rounds": [
    {"round": 1, "events": [
      {"type": "utterance", "sender": "speaker", "sentences": [
        {"tokens": ["the", "Blue", "one"],
         "annotations": {"lemmas": ["the", "blue", "one"],
                         "color": [{}, {"hue": 0.5, "sat": 1}, {}]}}
      ]},
      {"type": "action", "sender": "listener", "fields": {"clickX": 120, "clickColor": "blue", "hit": true}}
    ]}
  ]
}"#;

#[test]
fn parses_game_records() {
    let g: Game = serde_json::from_str(GAME_JSON).unwrap();
    assert_eq!(g.id, "g1");
    let r = &g.rounds[0];
    assert_eq!(r.events.len(), 2);

    let Event::Utterance(u) = &r.events[0] else {
        panic!("expected utterance");
    };
    assert_eq!(u.token_count(), 3);
    let lemmas = u.annotation_layer("lemmas").unwrap();
    assert_eq!(lemmas[1], AnnotationRef::Text("blue"));
    let color = u.annotation_layer("color").unwrap();
    match color[1] {
        AnnotationRef::Fields(f) => assert_eq!(f["sat"], 1.0),
        AnnotationRef::Text(_) => panic!("expected fields"),
    }

    let a = r.actions().next().unwrap();
    assert_eq!(a.fields["clickX"], ActionValue::Number(120.0));
    assert_eq!(a.fields["clickX"].to_string(), "120");
    assert_eq!(a.fields["clickColor"].to_string(), "blue");
    assert_eq!(a.fields["hit"].as_scalar(), Some(1.0));
    assert_eq!(a.fields["clickColor"].as_scalar(), None);
}

#[test]
fn non_finite_action_values_are_not_numeric() {
    assert_eq!(ActionValue::Text(" 2.5 ".to_string()).as_scalar(), Some(2.5));
    assert_eq!(ActionValue::Text("NaN".to_string()).as_scalar(), None);
    assert_eq!(ActionValue::Text("-inf".to_string()).as_scalar(), None);
    assert_eq!(ActionValue::Number(1e300).as_scalar(), None);
}

#[test]
fn annotation_layer_errors_and_token_fallback() {
    let g: Game = serde_json::from_str(GAME_JSON).unwrap();
    let u = g.rounds[0].utterances().next().unwrap();

    let err = u.annotation_layer("pos").unwrap_err();
    assert!(matches!(err, CorpusError::MalformedInput { .. }));
    assert!(err.to_string().contains("pos"));

    let raw = u.annotation_layer("tokens").unwrap();
    assert_eq!(raw[1], AnnotationRef::Text("Blue"));

    let mut short = u.clone();
    short.sentences[0]
        .annotations
        .get_mut("lemmas")
        .unwrap()
        .pop();
    assert!(short.annotation_layer("lemmas").is_err());
}

#[test]
fn json_dir_store_reads_in_file_name_order() {
    let dir = tempfile::tempdir().unwrap();
    for id in ["b", "a", "c"] {
        let g = Game {
            id: id.to_string(),
            rounds: Vec::new(),
        };
        fs::write(dir.path().join(format!("{id}.json")), serde_json::to_vec(&g).unwrap()).unwrap();
    }
    fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let store = JsonDirStore::open(dir.path()).unwrap();
    assert_eq!(store.len(), 3);
    let ids: Vec<String> = store.games().map(|g| g.unwrap().id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(store.read_one_game().unwrap().id, "a");
}

#[test]
fn json_dir_store_reports_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.json"), b"{\"id\": ").unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let err = store.games().next().unwrap().unwrap_err();
    match err {
        CorpusError::MalformedInput { context, .. } => assert!(context.contains("broken.json")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_dir_and_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let err = JsonDirStore::open(dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, CorpusError::NotFound(_)));

    let empty = MemoryStore::default();
    assert!(matches!(empty.read_one_game(), Err(CorpusError::Empty(_))));
}
