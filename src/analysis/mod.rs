//! Conversation analysis and reply post-processing

pub mod analyzer;
pub mod enhancer;

pub use analyzer::{AnalyzerRules, ConversationAnalysis, ConversationAnalyzer, Sentiment, TopicBucket};
pub use enhancer::{EnhancementContext, ResponseEnhancer};
