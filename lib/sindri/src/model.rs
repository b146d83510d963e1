use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Per-token occurrence counts, keyed by source.
pub type SourceCounts = BTreeMap<String, u64>;

/// Pipeline output: token -> source -> count.
pub type FinalResult = BTreeMap<String, SourceCounts>;

/// One occurrence of a token within a source's content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MappedItem {
    pub token: String,
    pub source: String,
}

impl MappedItem {
    pub fn new(token: impl Into<String>, source: impl Into<String>) -> Self {
        Self { token: token.into(), source: source.into() }
    }
}

/// Source key -> raw content, supplied by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkItemStore {
    items: BTreeMap<String, String>,
}

impl WorkItemStore {
    pub fn new() -> Self { Self::default() }

    /// Returns the previous content when `key` was already present.
    pub fn insert(&mut self, key: impl Into<String>, content: impl Into<String>) -> Option<String> {
        self.items.insert(key.into(), content.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> { self.items.get(key).map(String::as_str) }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn total_bytes(&self) -> usize { self.items.values().map(String::len).sum() }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for WorkItemStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = WorkItemStore::new();
        for (k, v) in iter {
            store.insert(k, v);
        }
        store
    }
}

/// Token -> every source it occurred in, one entry per occurrence.
///
/// Tokens iterate in the order they were first appended; each token's list
/// keeps append order and duplicates.
#[derive(Clone, Debug, Default)]
pub struct GroupedItems {
    index: HashMap<String, usize>,
    entries: Vec<(String, Vec<String>)>,
}

impl GroupedItems {
    pub fn new() -> Self { Self::default() }

    /// Get-or-create the token's list, then append `source` to it.
    pub fn append(&mut self, token: &str, source: &str) {
        let slot = match self.index.get(token) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.index.insert(token.to_string(), slot);
                self.entries.push((token.to_string(), Vec::new()));
                slot
            }
        };
        self.entries[slot].1.push(source.to_string());
    }

    pub fn get(&self, token: &str) -> Option<&[String]> {
        self.index.get(token).map(|&slot| self.entries[slot].1.as_slice())
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(t, s)| (t.as_str(), s.as_slice()))
    }

    pub fn total_occurrences(&self) -> usize {
        self.entries.iter().map(|(_, s)| s.len()).sum()
    }
}

impl IntoIterator for GroupedItems {
    type Item = (String, Vec<String>);
    type IntoIter = std::vec::IntoIter<(String, Vec<String>)>;

    fn into_iter(self) -> Self::IntoIter { self.entries.into_iter() }
}
