//! Textual relevance scoring of memory items against a query

use crate::agent::MemoryItem;

const KEY_WEIGHT: u32 = 2;
const VALUE_WEIGHT: u32 = 1;
const CATEGORY_WEIGHT: u32 = 1;
const MAX_RAW_SCORE: f32 = 3.0;

/// A pool item paired with its normalised relevance
#[derive(Debug, Clone, Copy)]
pub struct ScoredMemory<'a> {
    pub item: &'a MemoryItem,
    pub score: f32,
}

/// Raw additive score of `item` against an already lower-cased query
fn raw_score(query_lower: &str, item: &MemoryItem) -> u32 {
    let mut score = 0;

    let key = item.key.to_lowercase();
    if !key.is_empty() && query_lower.contains(&key) {
        score += KEY_WEIGHT;
    }

    let value = item.value.to_lowercase();
    if value.split_whitespace().any(|token| query_lower.contains(token)) {
        score += VALUE_WEIGHT;
    }

    if query_lower.contains(item.category.as_str()) {
        score += CATEGORY_WEIGHT;
    }

    score
}

/// Relevance of `item` to `query`, normalised to `[0, 1]`
pub fn score(query: &str, item: &MemoryItem) -> f32 {
    let raw = raw_score(&query.to_lowercase(), item);
    (raw as f32 / MAX_RAW_SCORE).min(1.0)
}

/// Score every item, keep those with a positive score, most relevant first.
///
/// The pool is left untouched. The sort is stable, so items with equal
/// scores keep their pool order.
pub fn rank<'a>(query: &str, pool: &'a [MemoryItem]) -> Vec<ScoredMemory<'a>> {
    let query_lower = query.to_lowercase();
    let mut scored: Vec<ScoredMemory<'a>> = pool
        .iter()
        .filter_map(|item| {
            let raw = raw_score(&query_lower, item);
            (raw > 0).then(|| ScoredMemory {
                item,
                score: (raw as f32 / MAX_RAW_SCORE).min(1.0),
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// Rank `pool` against `query` and return owned copies of the relevant
/// items with `confidence` set to their score and access recorded.
pub fn score_and_rank(query: &str, pool: &[MemoryItem]) -> Vec<MemoryItem> {
    rank(query, pool)
        .into_iter()
        .map(|scored| {
            let mut item = scored.item.clone();
            item.confidence = scored.score;
            item.touch();
            item
        })
        .collect()
}
