//! Memory extraction and relevance ranking
//!
//! - **Extractor**: turns user utterances into key/value [`MemoryItem`]s using
//!   an ordered, injectable rule table
//! - **Scorer**: ranks a pool of items against the next query by textual overlap
//!
//! Both are pure: they read their inputs and return new values.

pub mod extractor;
pub mod rules;
pub mod scorer;

pub use extractor::MemoryExtractor;
pub use rules::{default_rules, ExtractionRule};
pub use scorer::{rank, score, score_and_rank, ScoredMemory};

use std::collections::HashSet;

use crate::agent::MemoryItem;

/// Collapse repeats of the same fact, keeping the latest copy.
///
/// Two items are the same fact when key, value and category all match.
/// Several rules key on a verb ("love", "remember", "am"), so items sharing
/// only a key are distinct facts and all of them stay. Survivors keep pool
/// order, each at the position of its latest occurrence.
pub fn dedup_facts(items: Vec<MemoryItem>) -> Vec<MemoryItem> {
    let mut seen = HashSet::new();
    let mut kept: Vec<MemoryItem> = items
        .into_iter()
        .rev()
        .filter(|item| seen.insert((item.key.clone(), item.value.clone(), item.category)))
        .collect();
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::MemoryCategory;

    #[test]
    fn test_repeated_fact_keeps_latest_position() {
        let mut restated = MemoryItem::new("wallet", "the desk", MemoryCategory::Location, Some("again".to_string()));
        restated.access_count = 2;
        let items = vec![
            MemoryItem::new("wallet", "the desk", MemoryCategory::Location, None),
            MemoryItem::new("keys", "the car", MemoryCategory::Location, None),
            restated,
        ];

        let deduped = dedup_facts(items);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].key, "keys");
        assert_eq!(deduped[1].key, "wallet");
        assert_eq!(deduped[1].context.as_deref(), Some("again"));
        assert_eq!(deduped[1].access_count, 2);
    }

    #[test]
    fn test_shared_verb_key_keeps_every_value() {
        let items = vec![
            MemoryItem::new("love", "hiking", MemoryCategory::Preference, None),
            MemoryItem::new("love", "pizza", MemoryCategory::Preference, None),
            MemoryItem::new("wallet", "the desk", MemoryCategory::Location, None),
            MemoryItem::new("wallet", "the car", MemoryCategory::Location, None),
        ];

        let values: Vec<String> = dedup_facts(items).into_iter().map(|i| i.value).collect();
        assert_eq!(values, vec!["hiking", "pizza", "the desk", "the car"]);
    }
}
