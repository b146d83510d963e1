use crate::model::{MappedItem, SourceCounts};

// ========== Core map/reduce seams ==========

pub trait Mapper {
    /// Emit one `MappedItem` per token occurrence in `content`, in content order.
    fn do_map<F>(&self, source: &str, content: &str, emit: &mut F)
    where
        F: FnMut(MappedItem);
}

/// Reducer turns one token's grouped source list into its per-source counts.
/// Every count it returns must be at least 1.
pub trait Reducer {
    fn do_reduce<'a, I>(&self, token: &str, sources: I) -> SourceCounts
    where
        I: IntoIterator<Item = &'a str>;
}

/// Splits on runs of whitespace. Case is preserved.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhitespaceMapper;

impl Mapper for WhitespaceMapper {
    fn do_map<F>(&self, source: &str, content: &str, emit: &mut F)
    where
        F: FnMut(MappedItem),
    {
        for token in content.split_whitespace() {
            emit(MappedItem::new(token, source));
        }
    }
}

/// Counts how many times each source appears in a token's list.
#[derive(Clone, Copy, Debug, Default)]
pub struct OccurrenceReducer;

impl Reducer for OccurrenceReducer {
    fn do_reduce<'a, I>(&self, _token: &str, sources: I) -> SourceCounts
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts = SourceCounts::new();
        for source in sources {
            *counts.entry(source.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_all(source: &str, content: &str) -> Vec<MappedItem> {
        let mut out = Vec::new();
        WhitespaceMapper.do_map(source, content, &mut |item| out.push(item));
        out
    }

    #[test]
    fn whitespace_runs_split_tokens() {
        let items = map_all("a.txt", "  cat\tdog\n\ncat  ");
        let tokens: Vec<&str> = items.iter().map(|i| i.token.as_str()).collect();
        assert_eq!(tokens, vec!["cat", "dog", "cat"]);
        assert!(items.iter().all(|i| i.source == "a.txt"));
    }

    #[test]
    fn empty_and_blank_content_yield_nothing() {
        assert!(map_all("x.txt", "").is_empty());
        assert!(map_all("x.txt", " \n\t ").is_empty());
    }

    #[test]
    fn case_and_punctuation_are_kept() {
        let items = map_all("a", "Cat cat, CAT");
        let tokens: Vec<&str> = items.iter().map(|i| i.token.as_str()).collect();
        assert_eq!(tokens, vec!["Cat", "cat,", "CAT"]);
    }

    #[test]
    fn reducer_increments_on_repeat() {
        let counts = OccurrenceReducer.do_reduce("dog", ["a.txt", "b.txt", "b.txt"]);
        assert_eq!(counts.get("a.txt"), Some(&1));
        assert_eq!(counts.get("b.txt"), Some(&2));
        assert_eq!(counts.len(), 2);
    }
}
