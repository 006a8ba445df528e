//! Extraction rule tables

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::agent::MemoryCategory;
use crate::error::{AliceError, AliceResult};

/// One (pattern, category) pair.
///
/// The pattern runs against lower-cased text and should capture exactly two
/// groups, read as `(key, value)`. Matches with fewer groups are skipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionRule {
    pub pattern: String,
    pub category: MemoryCategory,
}

impl ExtractionRule {
    pub fn new(pattern: &str, category: MemoryCategory) -> Self {
        Self {
            pattern: pattern.to_string(),
            category,
        }
    }
}

/// A rule with its pattern compiled
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub regex: Regex,
    pub category: MemoryCategory,
}

impl CompiledRule {
    pub fn compile(rule: &ExtractionRule) -> AliceResult<Self> {
        let regex = Regex::new(&rule.pattern).map_err(|e| {
            AliceError::Configuration(format!(
                "Invalid {} extraction pattern '{}': {}",
                rule.category, rule.pattern, e
            ))
        })?;
        if regex.captures_len() < 3 {
            tracing::warn!(
                "Extraction pattern '{}' captures fewer than two groups and will never match",
                rule.pattern
            );
        }
        Ok(Self {
            regex,
            category: rule.category,
        })
    }
}

// Keys and values never cross sentence punctuation.
const KEY: &str = r"([^.!?\n]+?)";
const VALUE: &str = r"([^.!?\n]+)";

/// The built-in rule list, in declaration order.
///
/// Narrow shapes come first: a span claimed by an earlier rule is not
/// re-filed under a later, broader one.
pub fn default_rules() -> Vec<ExtractionRule> {
    use MemoryCategory::*;

    vec![
        // "my wallet is on the desk"; values starting with a digit read as times
        ExtractionRule::new(
            &format!(r"\b(?:my|the)\s+{KEY}\s+(?:is|are)\s+(?:at|in|on)\s+([^.!?\n\d][^.!?\n]*)"),
            Location,
        ),
        ExtractionRule::new(
            &format!(r"\b{KEY}\s+(?:is|are)\s+(?:located|placed|stored)\s+(?:at|in|on)\s+{VALUE}"),
            Location,
        ),
        // "the meeting is at 3pm"
        ExtractionRule::new(
            &format!(r"\b(?:(?:my|the)\s+)?{KEY}\s+(?:is|will be)\s+(?:on|at)\s+{VALUE}"),
            Schedule,
        ),
        // "remember that ..."
        ExtractionRule::new(
            &format!(r"\b(remember|remind)\s+(?:me\s+)?(?:that\s+)?{VALUE}"),
            Reminder,
        ),
        ExtractionRule::new(
            &format!(r"\bi\s+(like|love|prefer|hate|dislike)\s+{VALUE}"),
            Preference,
        ),
        ExtractionRule::new(
            &format!(r"\b(?:my|the)\s+{KEY}\s+(?:is|are)\s+{VALUE}"),
            Personal,
        ),
        ExtractionRule::new(&format!(r"\bi\s+(am|have|work)\s+{VALUE}"), Personal),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_compile_with_two_groups() {
        for rule in default_rules() {
            let compiled = CompiledRule::compile(&rule).unwrap();
            assert_eq!(compiled.regex.captures_len(), 3, "pattern {}", rule.pattern);
        }
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let rule = ExtractionRule::new("(unclosed", MemoryCategory::Personal);
        let err = CompiledRule::compile(&rule).unwrap_err();
        assert!(matches!(err, AliceError::Configuration(_)));
    }
}
