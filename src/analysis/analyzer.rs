//! Aggregate statistics over a conversation

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent::{Conversation, Role};

/// Coarse sentiment of the user's side of a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        };
        f.write_str(name)
    }
}

/// A named topic and the keywords that signal it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicBucket {
    pub name: String,
    pub keywords: Vec<String>,
}

impl TopicBucket {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Keyword tables used by the analyzer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzerRules {
    pub topics: Vec<TopicBucket>,
    pub positive_words: Vec<String>,
    pub negative_words: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for AnalyzerRules {
    fn default() -> Self {
        Self {
            topics: vec![
                TopicBucket::new("work", &["work", "job", "office", "meeting", "project", "deadline"]),
                TopicBucket::new("personal", &["family", "home", "personal", "life", "health"]),
                TopicBucket::new("technology", &["computer", "software", "app", "tech", "digital"]),
                TopicBucket::new("schedule", &["time", "date", "schedule", "appointment", "calendar"]),
                TopicBucket::new("location", &["place", "location", "address", "where", "room"]),
                TopicBucket::new("memory", &["remember", "recall", "memory", "forget", "stored"]),
            ],
            positive_words: words(&[
                "good", "great", "excellent", "amazing", "wonderful", "fantastic", "love", "like",
                "happy", "pleased",
            ]),
            negative_words: words(&[
                "bad", "terrible", "awful", "hate", "dislike", "angry", "frustrated",
                "disappointed", "sad",
            ]),
        }
    }
}

/// Result of [`ConversationAnalyzer::analyze`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationAnalysis {
    pub message_count: usize,
    pub user_message_count: usize,
    pub assistant_message_count: usize,
    pub system_message_count: usize,
    pub total_character_count: usize,
    pub topics: BTreeSet<String>,
    pub sentiment: Sentiment,
    pub questions_asked: usize,
    pub duration_minutes: f64,
}

/// Computes [`ConversationAnalysis`] from a conversation's messages and timestamps
#[derive(Debug, Clone, Default)]
pub struct ConversationAnalyzer {
    rules: AnalyzerRules,
}

impl ConversationAnalyzer {
    pub fn new(rules: AnalyzerRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &AnalyzerRules {
        &self.rules
    }

    pub fn analyze(&self, conversation: &Conversation) -> ConversationAnalysis {
        let messages = conversation.messages();
        let count_role = |role: Role| messages.iter().filter(|m| m.role == role).count();

        let all_text = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let user_text = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let duration = conversation.updated_at() - conversation.created_at();

        ConversationAnalysis {
            message_count: messages.len(),
            user_message_count: count_role(Role::User),
            assistant_message_count: count_role(Role::Assistant),
            system_message_count: count_role(Role::System),
            total_character_count: messages.iter().map(|m| m.content.chars().count()).sum(),
            topics: self.topics(&all_text),
            sentiment: self.sentiment(&user_text),
            questions_asked: messages.iter().map(|m| m.content.matches('?').count()).sum(),
            duration_minutes: duration.num_milliseconds() as f64 / 60_000.0,
        }
    }

    fn topics(&self, text: &str) -> BTreeSet<String> {
        self.rules
            .topics
            .iter()
            .filter(|bucket| bucket.keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|bucket| bucket.name.clone())
            .collect()
    }

    /// Counts how many listed words occur at all, not how often
    fn sentiment(&self, user_text: &str) -> Sentiment {
        let present = |list: &[String]| list.iter().filter(|w| user_text.contains(w.as_str())).count();
        let positive = present(&self.rules.positive_words);
        let negative = present(&self.rules.negative_words);

        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => Sentiment::Positive,
            std::cmp::Ordering::Less => Sentiment::Negative,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Message;

    #[test]
    fn test_counts() {
        let mut conversation = Conversation::new();
        conversation.append(Message::user("Hello?"));
        conversation.append(Message::assistant("Hi! How can I help?"));
        conversation.append(Message::user("Where is my wallet??"));

        let analysis = ConversationAnalyzer::default().analyze(&conversation);
        assert_eq!(analysis.message_count, 3);
        assert_eq!(analysis.user_message_count, 2);
        assert_eq!(analysis.assistant_message_count, 1);
        assert_eq!(analysis.system_message_count, 0);
        assert_eq!(analysis.questions_asked, 4);
        assert_eq!(analysis.total_character_count, 6 + 19 + 20);
        assert!(analysis.duration_minutes >= 0.0);
    }

    #[test]
    fn test_counts_add_up_with_system_messages() {
        let mut conversation = Conversation::new();
        conversation.append(Message::system("You are Alice."));
        conversation.append(Message::user("hi"));
        conversation.append(Message::assistant("hello"));

        let a = ConversationAnalyzer::default().analyze(&conversation);
        assert_eq!(
            a.message_count,
            a.user_message_count + a.assistant_message_count + a.system_message_count
        );
    }

    #[test]
    fn test_topics() {
        let mut conversation = Conversation::new();
        conversation.append(Message::user("I have a meeting at the office"));
        conversation.append(Message::assistant("Should I remember where it is?"));

        let analysis = ConversationAnalyzer::default().analyze(&conversation);
        let topics: Vec<&str> = analysis.topics.iter().map(String::as_str).collect();
        assert_eq!(topics, vec!["location", "memory", "work"]);
    }

    #[test]
    fn test_sentiment_uses_user_messages_only() {
        let mut conversation = Conversation::new();
        conversation.append(Message::user("This is great, I am so happy"));
        conversation.append(Message::assistant("That is terrible, awful and sad"));
        let analysis = ConversationAnalyzer::default().analyze(&conversation);
        assert_eq!(analysis.sentiment, Sentiment::Positive);

        let mut conversation = Conversation::new();
        conversation.append(Message::user("I feel sad and frustrated"));
        let analysis = ConversationAnalyzer::default().analyze(&conversation);
        assert_eq!(analysis.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_empty_conversation_is_neutral() {
        let analysis = ConversationAnalyzer::default().analyze(&Conversation::new());
        assert_eq!(analysis.message_count, 0);
        assert!(analysis.topics.is_empty());
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
        assert_eq!(analysis.questions_asked, 0);
    }

    #[test]
    fn test_custom_rules() {
        let rules = AnalyzerRules {
            topics: vec![TopicBucket::new("food", &["pizza", "pasta"])],
            positive_words: words(&["yum"]),
            negative_words: Vec::new(),
        };
        let mut conversation = Conversation::new();
        conversation.append(Message::user("pizza, yum"));

        let analysis = ConversationAnalyzer::new(rules).analyze(&conversation);
        assert!(analysis.topics.contains("food"));
        assert_eq!(analysis.sentiment, Sentiment::Positive);
    }
}
