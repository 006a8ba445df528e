//! Post-processing of assistant replies

use std::collections::BTreeSet;

use regex::Regex;

use crate::agent::MemoryItem;

/// What the enhancer knows about the turn being answered
#[derive(Debug, Clone, Default)]
pub struct EnhancementContext {
    pub memories_used: Vec<MemoryItem>,
    pub topics: BTreeSet<String>,
    pub user_question_count: usize,
}

/// Appends memory references and tips to a reply, and optionally marks
/// memory/location/time words.
#[derive(Debug, Clone)]
pub struct ResponseEnhancer {
    markers: Vec<(Regex, &'static str)>,
    decorate: bool,
}

impl Default for ResponseEnhancer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ResponseEnhancer {
    pub fn new(decorate: bool) -> Self {
        let markers = [
            (r"(?i)\b(remember|recall)\b", "🧠"),
            (r"(?i)\b(location|place)\b", "📍"),
            (r"(?i)\b(time|date|schedule)\b", "📅"),
        ]
        .into_iter()
        .map(|(pattern, marker)| (Regex::new(pattern).expect("static marker pattern"), marker))
        .collect();

        Self { markers, decorate }
    }

    pub fn enhance(&self, reply: &str, context: &EnhancementContext) -> String {
        let mut enhanced = reply.to_string();

        if !context.memories_used.is_empty() {
            enhanced.push_str("\n\nBased on what I remember:\n");
            for memory in &context.memories_used {
                enhanced.push_str(&format!("- {}: {}\n", memory.key, memory.value));
            }
        }

        if context.user_question_count > 0 {
            let mut tips = Vec::new();
            if context.topics.contains("location") {
                tips.push("Tip: I can help you remember where you put things!");
            }
            if context.topics.contains("schedule") {
                tips.push("Tip: I can remember important dates and deadlines for you!");
            }
            if !tips.is_empty() {
                enhanced.push_str("\n\n");
                enhanced.push_str(&tips.join("\n"));
            }
        }

        if self.decorate {
            for (regex, marker) in &self.markers {
                enhanced = regex
                    .replace_all(&enhanced, format!("{} $1", marker).as_str())
                    .into_owned();
            }
        }

        enhanced
    }
}
