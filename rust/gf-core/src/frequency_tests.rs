use std::collections::BTreeMap;

use crate::{FrequencyError, FrequencyIndex};

fn index_of(keys: &[(&str, u64)]) -> FrequencyIndex {
    let mut c = FrequencyIndex::new();
    for &(k, n) in keys {
        for _ in 0..n {
            c.increment(k);
        }
    }
    c
}

fn pins(p: &[(&str, usize)]) -> BTreeMap<String, usize> {
    p.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

#[test]
fn increment_counts_from_zero() {
    let c = index_of(&[("x", 3), ("y", 1)]);
    assert_eq!(c.count("x"), 3);
    assert_eq!(c.count("y"), 1);
    assert_eq!(c.count("z"), 0);
    assert_eq!(c.len(), 2);
}

#[test]
fn build_index_is_lexicographic() {
    let c = index_of(&[("b", 1), ("a", 1), ("c", 1)]);
    let idx = c.build_index();
    assert_eq!(idx, pins(&[("a", 0), ("b", 1), ("c", 2)]));
}

#[test]
fn build_index_uses_byte_order() {
    let c = index_of(&[("b", 1), ("B", 1), ("_x", 1)]);
    let idx = c.build_index();
    assert_eq!(idx["B"], 0);
    assert_eq!(idx["_x"], 1);
    assert_eq!(idx["b"], 2);
}

#[test]
fn remove_less_than_is_strict() {
    let mut c = index_of(&[("a", 1), ("b", 3), ("c", 5)]);
    c.remove_less_than(3);
    let keys: Vec<String> = c.build_index().into_keys().collect();
    assert_eq!(keys, vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn pinned_keys_take_their_slots_and_rest_fill_in_order() {
    let c = index_of(&[
        ("dog", 2),
        ("MISSING_SYMBOL", 1),
        ("START_SYMBOL", 1),
        ("TERMINAL_SYMBOL", 1),
        ("cat", 1),
    ]);
    let p = pins(&[("START_SYMBOL", 0), ("TERMINAL_SYMBOL", 1), ("MISSING_SYMBOL", 2)]);
    let idx = c.build_index_pinned(&p).unwrap();
    assert_eq!(idx["START_SYMBOL"], 0);
    assert_eq!(idx["TERMINAL_SYMBOL"], 1);
    assert_eq!(idx["MISSING_SYMBOL"], 2);
    assert_eq!(idx["cat"], 3);
    assert_eq!(idx["dog"], 4);
}

#[test]
fn uncounted_pinned_keys_are_ignored() {
    let c = index_of(&[("b", 1), ("a", 1)]);
    let idx = c.build_index_pinned(&pins(&[("zzz", 0), ("b", 0)])).unwrap();
    assert_eq!(idx, pins(&[("b", 0), ("a", 1)]));
}

#[test]
fn pinned_slot_errors() {
    let c = index_of(&[("a", 1), ("b", 1)]);
    let err = c.build_index_pinned(&pins(&[("a", 2)])).unwrap_err();
    assert!(matches!(err, FrequencyError::PinnedSlotOutOfRange { slot: 2, size: 2, .. }));

    let err = c.build_index_pinned(&pins(&[("a", 1), ("b", 1)])).unwrap_err();
    assert_eq!(
        err,
        FrequencyError::PinnedSlotConflict {
            slot: 1,
            first: "a".to_string(),
            second: "b".to_string(),
        }
    );
}

#[test]
fn sorted_counts_and_top() {
    let c = index_of(&[("b", 2), ("a", 2), ("c", 5), ("d", 1)]);
    let sorted = c.sorted_counts();
    let keys: Vec<&str> = sorted.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["c", "a", "b", "d"]);

    let top = c.top(2);
    assert_eq!(top, vec![("c".to_string(), 5), ("a".to_string(), 2)]);
    assert_eq!(c.top(10).len(), 4);
}
