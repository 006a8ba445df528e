use std::io::{BufRead, Write};

use crate::agent::{ChatResponse, Conversation, MemoryItem, Session};
use crate::analysis::ConversationAnalysis;
use crate::config::Config;
use crate::error::AliceResult;

const PREVIEW_CHARS: usize = 100;

const HELP: &str = "\
Commands:
  /new                   Start a new conversation
  /history               Show the current conversation
  /memory <key> <value>  Store a memory
  /memories              Memories from this conversation and the store
  /recall <query>        Search stored memories
  /analyze               Topics, sentiment and counts for this conversation
  /models                List model presets
  /model <preset>        Load a model preset
  /retry                 Answer the last message again
  /help                  Show this help
  /quit, /exit           Leave";

enum Flow {
    Continue,
    Quit,
}

/// Line-oriented chat console over `input`/`output`
pub async fn run<R: BufRead, W: Write>(
    session: &mut Session,
    config: &Config,
    mut input: R,
    mut out: W,
) -> AliceResult<()> {
    writeln!(out, "Welcome to Alice, your assistant with memory.")?;
    writeln!(out, "Type a message to chat, /help for commands.")?;

    loop {
        write!(out, "\nYou: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            match handle_command(session, config, command, &mut out).await {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => writeln!(out, "Error: {}", e)?,
            }
            continue;
        }

        match session.send(line).await {
            Ok(response) => print_response(&mut out, &response)?,
            Err(e) => writeln!(out, "Error: {}", e)?,
        }
    }

    writeln!(out, "Goodbye!")?;
    Ok(())
}

async fn handle_command<W: Write>(
    session: &mut Session,
    config: &Config,
    command: &str,
    out: &mut W,
) -> AliceResult<Flow> {
    let (name, rest) = split_word(command);
    if name.is_empty() {
        writeln!(out, "{}", HELP)?;
        return Ok(Flow::Continue);
    }

    match name.to_lowercase().as_str() {
        "quit" | "exit" => return Ok(Flow::Quit),
        "new" => {
            let id = session.start_new().await?;
            writeln!(out, "New conversation started: {}", id)?;
        }
        "history" => print_history(out, &session.history().await?)?,
        "memory" => match split_word(rest) {
            (key, value) if !key.is_empty() && !value.is_empty() => {
                session.agent().memory_store().store(key, value, Some("console")).await?;
                writeln!(out, "Memory stored: {}", key)?;
            }
            _ => writeln!(out, "Usage: /memory <key> <value>")?,
        },
        "memories" => {
            let mut items = session.agent().memory_store().items().await?;
            if session.current_id().is_some() {
                items.extend(session.memories().await?);
            }
            print_memories(out, &items)?;
        }
        "recall" if !rest.is_empty() => {
            let found = session.agent().memory_store().retrieve(rest).await?;
            if found.is_empty() {
                writeln!(out, "No memories match '{}'", rest)?;
            }
            for memory in found {
                writeln!(out, "  {}", memory)?;
            }
        }
        "recall" => writeln!(out, "Usage: /recall <query>")?,
        "analyze" => print_analysis(out, &session.analyze().await?)?,
        "models" => {
            let status = session.agent().model_status().await;
            writeln!(out, "Available models:")?;
            for (name, preset) in &config.presets {
                let active = if preset.model_name == status.model.model_name { " (active)" } else { "" };
                writeln!(out, "  - {}: {}{}", name, preset.model_name, active)?;
            }
        }
        "model" if !rest.is_empty() => {
            let preset = config.preset(split_word(rest).0)?;
            let model_name = preset.model_name.clone();
            session.agent().load_model(preset).await?;
            writeln!(out, "Model {} loaded", model_name)?;
        }
        "model" => writeln!(out, "Usage: /model <preset>")?,
        "retry" => match session.current_id() {
            Some(id) => {
                let response = session.agent().retry(id, None).await?;
                print_response(out, &response)?;
            }
            None => writeln!(out, "No active conversation")?,
        },
        "help" => writeln!(out, "{}", HELP)?,
        other => writeln!(out, "Unknown command: /{}", other)?,
    }
    Ok(Flow::Continue)
}

/// First whitespace-separated word and the trimmed rest of the line
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

pub fn print_response<W: Write>(out: &mut W, response: &ChatResponse) -> AliceResult<()> {
    writeln!(out, "Alice: {}", response.message.content)?;

    let mut details = Vec::new();
    if let Some(seconds) = response.processing_time {
        details.push(format!("{:.2}s", seconds));
    }
    if let Some(model) = response
        .model_info
        .as_ref()
        .and_then(|info| info.get("model_name"))
        .and_then(|v| v.as_str())
    {
        details.push(format!("model: {}", model));
    }
    if !details.is_empty() {
        writeln!(out, "  ({})", details.join(" | "))?;
    }
    Ok(())
}

pub fn print_history<W: Write>(out: &mut W, conversation: &Conversation) -> AliceResult<()> {
    writeln!(
        out,
        "Conversation: {} ({})",
        conversation.title.as_deref().unwrap_or("Untitled"),
        conversation.id
    )?;
    for message in conversation.messages() {
        let mut content: String = message.content.chars().take(PREVIEW_CHARS).collect();
        if message.content.chars().count() > PREVIEW_CHARS {
            content.push_str("...");
        }
        writeln!(out, "  [{}] {}: {}", message.timestamp.format("%H:%M:%S"), message.role, content)?;
    }
    Ok(())
}

pub fn print_memories<W: Write>(out: &mut W, items: &[MemoryItem]) -> AliceResult<()> {
    if items.is_empty() {
        writeln!(out, "No memories yet.")?;
    }
    for item in items {
        writeln!(out, "  [{}] {}: {}", item.category, item.key, item.value)?;
    }
    Ok(())
}

pub fn print_analysis<W: Write>(out: &mut W, analysis: &ConversationAnalysis) -> AliceResult<()> {
    writeln!(
        out,
        "Messages: {} (user {}, assistant {}, system {})",
        analysis.message_count,
        analysis.user_message_count,
        analysis.assistant_message_count,
        analysis.system_message_count
    )?;
    writeln!(out, "Characters: {}", analysis.total_character_count)?;
    let topics: Vec<&str> = analysis.topics.iter().map(String::as_str).collect();
    writeln!(out, "Topics: {}", if topics.is_empty() { "none".to_string() } else { topics.join(", ") })?;
    writeln!(out, "Sentiment: {}", analysis.sentiment)?;
    writeln!(out, "Questions asked: {}", analysis.questions_asked)?;
    writeln!(out, "Duration: {:.1} minutes", analysis.duration_minutes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::backend::ScriptedBackend;
    use crate::storage::InMemoryStorage;
    use std::io::Cursor;
    use std::sync::Arc;

    async fn run_script(script: &str) -> String {
        let agent = Agent::new(Arc::new(InMemoryStorage::new()), Arc::new(ScriptedBackend::new()));
        let mut session = Session::new(Arc::new(agent), None);
        let mut out = Vec::new();
        run(&mut session, &Config::default(), Cursor::new(script.to_string()), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_chat_and_commands() {
        let output = run_script(
            "my wallet is on the desk\n/memories\n/memory umbrella by the door\n/recall umbrella\n/analyze\n/quit\nnever sent\n",
        )
        .await;

        assert!(output.contains("Alice: Got it"));
        assert!(output.contains("[location] wallet: the desk"));
        assert!(output.contains("Memory stored: umbrella"));
        assert!(output.contains("MEMORY: umbrella = by the door"));
        assert!(output.contains("Messages: 2 (user 1, assistant 1, system 0)"));
        assert!(!output.contains("never sent"));
        assert!(output.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn test_memory_command_tolerates_extra_spaces() {
        let output = run_script("/memory   umbrella    by the   door\n/recall   umbrella\n").await;
        assert!(output.contains("Memory stored: umbrella"));
        assert!(output.contains("MEMORY: umbrella = by the   door"));
        assert!(!output.contains("Usage:"));
    }

    #[test]
    fn test_split_word() {
        assert_eq!(split_word("  memory  key value  "), ("memory", "key value"));
        assert_eq!(split_word("quit"), ("quit", ""));
        assert_eq!(split_word("   "), ("", ""));
    }

    #[tokio::test]
    async fn test_errors_do_not_end_the_loop() {
        let output = run_script("/history\n/bogus\n/memory onlykey\n/models\n").await;
        assert!(output.contains("Error: Invalid input: No active conversation"));
        assert!(output.contains("Unknown command: /bogus"));
        assert!(output.contains("Usage: /memory <key> <value>"));
        assert!(output.contains("dialogpt-medium: microsoft/DialoGPT-medium (active)"));
        assert!(output.ends_with("Goodbye!\n"));
    }
}
