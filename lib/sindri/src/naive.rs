//! Single-threaded word count with no pools or barriers. Used to cross-check
//! the pipeline's output.

use crate::model::{FinalResult, WorkItemStore};

pub fn word_count(store: &WorkItemStore) -> FinalResult {
    let mut global = FinalResult::new();
    for (source, content) in store.iter() {
        for token in content.split_whitespace() {
            *global
                .entry(token.to_string())
                .or_default()
                .entry(source.to_string())
                .or_insert(0) += 1;
        }
    }
    global
}

/// Tokens whose per-source counts differ between `a` and `b`, sorted.
pub fn diff(a: &FinalResult, b: &FinalResult) -> Vec<String> {
    let mut tokens: Vec<String> = a
        .keys()
        .chain(b.keys())
        .filter(|t| a.get(*t) != b.get(*t))
        .cloned()
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}
