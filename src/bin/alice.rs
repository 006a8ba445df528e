//! Alice - conversational assistant with memory
//!
//! Chats through a pluggable generation backend and remembers facts the user
//! mentions, re-injecting the relevant ones into later turns.

use alice::backend::BackendConfig;
use alice::storage::StorageKind;
use alice::{Config, EmbeddedAlice};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Alice - a conversational assistant that remembers what you tell it
#[derive(Parser)]
#[command(
    name = "alice",
    author,
    version,
    about = "Conversational assistant with rule-based memory",
    long_about = r#"
Alice keeps per-conversation history, extracts facts such as
"my wallet is on the desk" from what you say, and brings the relevant
ones back when you ask about them later.

Examples:
  alice                          Start an interactive chat
  alice chat --resume <id>       Continue an earlier conversation
  alice history                  List recent conversations
  alice remember wallet on the desk
  alice recall wallet
  alice --backend http://localhost:8080/v1 chat
"#
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for persistence
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage: memory, json or fjall
    #[arg(short, long, global = true)]
    storage: Option<StorageKind>,

    /// Backend: "scripted" or the base URL of an OpenAI-compatible API
    #[arg(short, long, global = true)]
    backend: Option<String>,

    /// Model preset name
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Personality (system prompt) for new conversations
    #[arg(short, long, global = true)]
    personality: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive console (default)
    #[command(alias = "console", alias = "repl")]
    Chat(ChatArgs),

    /// List conversations, or show one
    History(HistoryArgs),

    /// Store a memory
    Remember {
        key: String,
        #[arg(required = true, trailing_var_arg = true)]
        value: Vec<String>,
    },

    /// Search stored memories
    Recall {
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Analyze a conversation
    Analyze { id: String },

    /// List model presets
    Models,

    /// Display version and configuration
    Info,
}

#[derive(Args)]
struct ChatArgs {
    /// Conversation id to continue
    #[arg(short, long)]
    resume: Option<String>,
}

#[derive(Args)]
struct HistoryArgs {
    /// Conversation id; lists recent conversations when omitted
    id: Option<String>,

    /// Number of conversations to list
    #[arg(short, long, default_value = "20")]
    limit: usize,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(storage) = cli.storage {
        config.storage = storage;
    }
    if let Some(backend) = &cli.backend {
        config.backend = BackendConfig::from_flag(backend)?;
    }
    if let Some(preset) = &cli.model {
        config.model = config.preset(preset)?;
    }
    if let Some(personality) = &cli.personality {
        config.personality = personality.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only when RUST_LOG is set)
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt::init();
    }

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Info and Models never touch storage
    match cli.command {
        Some(Commands::Info) => print_info(&config),
        Some(Commands::Models) => print_models(&config),
        Some(Commands::Chat(args)) => run_chat(&open(config)?, args.resume).await?,
        None => run_chat(&open(config)?, None).await?,
        Some(Commands::History(args)) => show_history(&open(config)?, args).await?,

        Some(Commands::Remember { key, value }) => {
            let alice = open(config)?;
            alice.agent().memory_store().store(&key, &value.join(" "), Some("cli")).await?;
            println!("Memory stored: {}", key);
        }

        Some(Commands::Recall { query }) => {
            let alice = open(config)?;
            let query = query.join(" ");
            let found = alice.agent().memory_store().retrieve(&query).await?;
            if found.is_empty() {
                println!("No memories match '{}'", query);
            }
            for memory in found {
                println!("  {}", memory);
            }
        }

        Some(Commands::Analyze { id }) => {
            let analysis = open(config)?.agent().analyze(&id).await?;
            alice::cli::print_analysis(&mut std::io::stdout(), &analysis)?;
        }
    }

    Ok(())
}

fn open(config: Config) -> Result<EmbeddedAlice> {
    let data_dir = config.data_dir.clone();
    EmbeddedAlice::new(config).with_context(|| format!("Failed to open Alice data in {}", data_dir.display()))
}

fn print_info(config: &Config) {
    println!("Alice - conversational assistant with memory");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Features:");
    #[cfg(feature = "fjall-storage")]
    println!("  - fjall storage");
    #[cfg(not(feature = "fjall-storage"))]
    println!("  - fjall storage: disabled");
    #[cfg(feature = "http-backend")]
    println!("  - HTTP backend (reqwest)");
    #[cfg(not(feature = "http-backend"))]
    println!("  - HTTP backend: disabled");
    println!();
    println!("Data directory: {}", config.data_dir.display());
    println!("Storage: {:?}", config.storage);
    println!("Backend: {:?}", config.backend);
    println!("Model: {}", config.model.model_name);
    println!("Personality: {}", config.personality);
}

fn print_models(config: &Config) {
    println!("Available models:");
    for (name, preset) in &config.presets {
        println!(
            "  - {}: {} (max_length {}, temperature {})",
            name, preset.model_name, preset.max_length, preset.temperature
        );
    }
}

async fn show_history(alice: &EmbeddedAlice, args: HistoryArgs) -> Result<()> {
    match args.id {
        Some(id) => {
            let conversation = alice.agent().conversation_history(&id).await?;
            alice::cli::print_history(&mut std::io::stdout(), &conversation)?;
        }
        None => {
            let conversations = alice.agent().list_conversations(args.limit).await?;
            if conversations.is_empty() {
                println!("No conversations found.");
            }
            for conversation in conversations {
                println!(
                    "  {}  {}  {} messages  (updated {})",
                    conversation.id,
                    conversation.title.as_deref().unwrap_or("Untitled"),
                    conversation.message_count(),
                    conversation.updated_at().format("%Y-%m-%d %H:%M")
                );
            }
        }
    }
    Ok(())
}

async fn run_chat(alice: &EmbeddedAlice, resume: Option<String>) -> Result<()> {
    let model = alice.config().model.clone();
    println!("Loading model: {}", model.model_name);
    let model_name = model.model_name.clone();
    alice
        .agent()
        .load_model(model)
        .await
        .with_context(|| format!("Failed to load model {}", model_name))?;

    let mut session = alice.session();
    match resume {
        Some(id) => {
            session.resume(&id).await?;
            println!("Continuing conversation {}", id);
        }
        None => {
            let id = session.start_new().await?;
            println!("New conversation started: {}", id);
        }
    }

    let stdin = std::io::stdin();
    alice::cli::run(&mut session, alice.config(), stdin.lock(), std::io::stdout()).await?;
    Ok(())
}
