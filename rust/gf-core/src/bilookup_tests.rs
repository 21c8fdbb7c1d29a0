use crate::{BiLookup, LookupError};

#[test]
fn inserted_pairs_resolve_both_ways() {
    let mut b = BiLookup::new();
    b.insert("a", 0);
    b.insert("b", 1);
    b.insert("c", 7);

    for (k, v) in [("a", 0usize), ("b", 1), ("c", 7)] {
        assert_eq!(b.get(k), Some(v));
        assert_eq!(b.get_reverse(v), Some(k));
        assert!(b.contains(k));
        assert!(b.contains_reverse(v));
    }
    assert_eq!(b.len(), 3);
}

#[test]
fn absent_key_is_distinct_from_index_zero() {
    let b = BiLookup::from_index([("zero", 0usize)]);
    assert_eq!(b.get("zero"), Some(0));
    assert_eq!(b.get("missing"), None);
    assert_eq!(b.get_reverse(5), None);
    assert!(!b.contains("missing"));

    let err = b.require("missing").unwrap_err();
    assert!(matches!(err, LookupError::KeyNotFound(ref k) if k == "missing"));
    assert_eq!(b.require("zero").unwrap(), 0);
}

#[test]
fn duplicate_key_insert_keeps_last_value() {
    let mut b = BiLookup::new();
    b.insert("k", 1);
    b.insert("k", 4);
    assert_eq!(b.get("k"), Some(4));
    assert_eq!(b.len(), 1);
    assert_eq!(b.get_reverse(4), Some("k"));
    // Stale reverse entry is not cleaned up.
    assert_eq!(b.get_reverse(1), Some("k"));
}

#[test]
fn iter_is_ordered_by_index() {
    let b = BiLookup::from_index([("z", 0usize), ("a", 2), ("m", 1)]);
    let keys: Vec<&str> = b.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["z", "m", "a"]);
}

#[test]
fn save_then_load_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocab.json");
    let b = BiLookup::from_index([("START_SYMBOL", 0usize), ("dog", 3), ("cat", 4)]);
    b.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"forward\""));
    assert!(text.contains("\"reverse\""));

    let got = BiLookup::load(&path).unwrap();
    assert_eq!(got, b);
}

#[test]
fn save_replaces_the_file_without_leaving_tmp() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocab.json");
    BiLookup::from_index([("a", 0usize)]).save(&path).unwrap();

    // A stale tmp from an interrupted save is overwritten, not read.
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, b"{ half").unwrap();
    let b = BiLookup::from_index([("a", 0usize), ("b", 1)]);
    b.save(&path).unwrap();

    assert!(!tmp.exists());
    assert_eq!(BiLookup::load(&path).unwrap(), b);
}

#[test]
fn load_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = BiLookup::load(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, LookupError::NotFound(_)));
}
