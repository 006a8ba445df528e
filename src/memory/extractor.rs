//! Pattern-based memory extraction from user messages

use std::ops::Range;

use crate::agent::{Conversation, MemoryItem, Role};
use crate::error::AliceResult;
use super::rules::{default_rules, CompiledRule, ExtractionRule};

/// Extracts key/value facts from user-authored text.
///
/// Extraction reads only the conversation's messages and keeps no state, so
/// running it twice on the same conversation yields the same facts.
#[derive(Debug, Clone)]
pub struct MemoryExtractor {
    rules: Vec<CompiledRule>,
}

impl Default for MemoryExtractor {
    fn default() -> Self {
        Self::new(default_rules()).expect("built-in extraction rules are valid")
    }
}

impl MemoryExtractor {
    /// Build an extractor from an ordered rule list
    pub fn new(rules: Vec<ExtractionRule>) -> AliceResult<Self> {
        let rules = rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<AliceResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Extract memory items from every user message, in message order
    pub fn extract_memories(&self, conversation: &Conversation) -> Vec<MemoryItem> {
        conversation
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .flat_map(|m| self.extract_from_text(&m.content))
            .collect()
    }

    /// Extract memory items from a single piece of text.
    ///
    /// Rules run in declaration order and each may match several times. A
    /// match lying inside a span already claimed by an earlier match is
    /// dropped, so one phrase is filed under one category only.
    pub fn extract_from_text(&self, text: &str) -> Vec<MemoryItem> {
        let lowered = text.to_lowercase();
        let mut claimed: Vec<Range<usize>> = Vec::new();
        let mut memories = Vec::new();

        for rule in &self.rules {
            for caps in rule.regex.captures_iter(&lowered) {
                let Some(whole) = caps.get(0) else { continue };
                let span = whole.range();
                if claimed.iter().any(|c| c.start <= span.start && span.end <= c.end) {
                    continue;
                }

                let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                let key = key.as_str().trim();
                let value = value.as_str().trim();
                if key.is_empty() || value.is_empty() {
                    continue;
                }

                claimed.push(span);
                tracing::debug!("Extracted {} memory: {} -> {}", rule.category, key, value);
                memories.push(MemoryItem::new(key, value, rule.category, Some(text.to_string())));
            }
        }

        memories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{MemoryCategory, Message};

    fn facts(items: &[MemoryItem]) -> Vec<(String, String, MemoryCategory)> {
        items
            .iter()
            .map(|i| (i.key.clone(), i.value.clone(), i.category))
            .collect()
    }

    #[test]
    fn test_location_statement_yields_single_item() {
        let extractor = MemoryExtractor::default();
        let items = extractor.extract_from_text("my wallet is on the desk");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, MemoryCategory::Location);
        assert_eq!(items[0].key, "wallet");
        assert_eq!(items[0].value, "the desk");
        assert_eq!(items[0].context.as_deref(), Some("my wallet is on the desk"));
    }

    #[test]
    fn test_table_examples() {
        let extractor = MemoryExtractor::default();

        let items = extractor.extract_from_text("I work as an engineer");
        assert_eq!(facts(&items), vec![("work".into(), "as an engineer".into(), MemoryCategory::Personal)]);

        let items = extractor.extract_from_text("The meeting is at 3pm");
        assert_eq!(facts(&items), vec![("meeting".into(), "3pm".into(), MemoryCategory::Schedule)]);

        let items = extractor.extract_from_text("Remember that I have a dentist appointment");
        assert_eq!(
            facts(&items),
            vec![("remember".into(), "i have a dentist appointment".into(), MemoryCategory::Reminder)]
        );

        let items = extractor.extract_from_text("I love hiking!");
        assert_eq!(facts(&items), vec![("love".into(), "hiking".into(), MemoryCategory::Preference)]);

        let items = extractor.extract_from_text("My name is Bob");
        assert_eq!(facts(&items), vec![("name".into(), "bob".into(), MemoryCategory::Personal)]);
    }

    #[test]
    fn test_independent_spans_produce_separate_items() {
        let extractor = MemoryExtractor::default();
        let items = extractor.extract_from_text("My keys are in the car. I love hiking. I prefer tea");

        assert_eq!(
            facts(&items),
            vec![
                ("keys".into(), "the car".into(), MemoryCategory::Location),
                ("love".into(), "hiking".into(), MemoryCategory::Preference),
                ("prefer".into(), "tea".into(), MemoryCategory::Preference),
            ]
        );
    }

    #[test]
    fn test_only_user_messages_are_scanned() {
        let mut conversation = Conversation::new();
        conversation.append(Message::system("my wallet is on the desk"));
        conversation.append(Message::assistant("your keys are in the car"));
        conversation.append(Message::user("hello there"));
        assert!(MemoryExtractor::default().extract_memories(&conversation).is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let mut conversation = Conversation::new();
        conversation.append(Message::user("my wallet is on the desk"));
        conversation.append(Message::assistant("Got it"));
        conversation.append(Message::user("I love hiking. The party will be on friday"));

        let extractor = MemoryExtractor::default();
        let first = extractor.extract_memories(&conversation);
        let second = extractor.extract_memories(&conversation);

        assert_eq!(first.len(), 3);
        assert_eq!(facts(&first), facts(&second));
    }

    #[test]
    fn test_custom_rules_and_single_group_rules_are_skipped() {
        let rules = vec![
            ExtractionRule::new(r"favourite (\w+) is (\w+)", MemoryCategory::Preference),
            ExtractionRule::new(r"call me (\w+)", MemoryCategory::Personal),
        ];
        let extractor = MemoryExtractor::new(rules).unwrap();
        assert_eq!(extractor.rule_count(), 2);

        let items = extractor.extract_from_text("My favourite colour is green, call me Al");
        assert_eq!(facts(&items), vec![("colour".into(), "green".into(), MemoryCategory::Preference)]);
    }

    #[test]
    fn test_empty_inputs() {
        let extractor = MemoryExtractor::default();
        assert!(extractor.extract_from_text("").is_empty());
        assert!(extractor.extract_memories(&Conversation::new()).is_empty());
    }
}
