//! Reserved vocabulary symbols and on-disk naming.
//!
//! Every token-sequence feature frames an utterance with a START row and a
//! TERMINAL row, and maps unknown tokens to MISSING. These symbols occupy the
//! first vocabulary slots of every sequence feature:
//!
//! | Symbol   | Index | Vocabulary key    |
//! |----------|-------|-------------------|
//! | START    | 0     | `START_SYMBOL`    |
//! | TERMINAL | 1     | `TERMINAL_SYMBOL` |
//! | MISSING  | 2     | `MISSING_SYMBOL`  |
//!
//! Embedding features have no vocabulary; they reserve the same three leading
//! columns ahead of the embedding vector.

use std::collections::BTreeMap;

/// File-name prefix of per-feature sidecar documents in a saved feature set.
pub const FEATURE_FILE_PREFIX: &str = "_f.";

/// Number of reserved leading slots in sequence features.
pub const RESERVED_SYMBOL_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Start,
    Terminal,
    Missing,
}

impl Symbol {
    pub const ALL: [Symbol; RESERVED_SYMBOL_COUNT] = [Symbol::Start, Symbol::Terminal, Symbol::Missing];

    pub fn index(self) -> usize {
        match self {
            Symbol::Start => 0,
            Symbol::Terminal => 1,
            Symbol::Missing => 2,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Symbol::Start => "START_SYMBOL",
            Symbol::Terminal => "TERMINAL_SYMBOL",
            Symbol::Missing => "MISSING_SYMBOL",
        }
    }
}

/// Pinned slots handed to `FrequencyIndex::build_index_pinned`.
pub fn reserved_slots() -> BTreeMap<String, usize> {
    Symbol::ALL
        .iter()
        .map(|s| (s.key().to_string(), s.index()))
        .collect()
}
