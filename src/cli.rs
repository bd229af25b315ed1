//! Command-line interface parsing and the interactive chat loop.
//!
//! Everything here is front-end plumbing over the library surface: it
//! reads lines, dispatches slash commands, and mirrors transcript changes
//! to stdout. Turn handling itself lives in [`crate::core::session`].

use std::error::Error;
use std::io::Write as _;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::api::client::BackendClient;
use crate::core::config::Config;
use crate::core::constants::{
    DEFAULT_MODEL, DEFAULT_SEARCH_RESULTS, DEFAULT_SERVER_URL, DEFAULT_TEMPERATURE,
};
use crate::core::message::{ConversationEntry, Role};
use crate::core::persona::Persona;
use crate::core::session::{ChatSession, DeliveryMode, TurnStatus};
use crate::core::storage::{FileStore, KeyValueStore};
use crate::core::transcript::TranscriptStore;

#[derive(Parser)]
#[command(name = "palaver")]
#[command(about = "A command-line chat client for self-hosted assistant backends")]
#[command(
    long_about = "Palaver connects to a self-hosted assistant backend for multi-turn \
conversations with streamed replies, optional web-search context, and one-shot \
image generation and web search.\n\n\
The conversation transcript, system prompt, and persona persist across sessions.\n\n\
Chat commands:\n\
  /persona [NAME]   Show or switch the persona (default, coder, teacher, creative)\n\
  /system TEXT      Replace the system prompt\n\
  /clear            Clear the conversation transcript\n\
  /quit             Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the assistant backend
    #[arg(short = 'u', long, value_name = "URL")]
    pub server_url: Option<String>,

    /// Model identifier sent with each chat turn
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature; non-finite values fall back to 0.7
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Ask for the whole reply at once instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Let the backend augment replies with web-search context
    #[arg(long)]
    pub search: bool,

    /// System prompt for this session (persisted for the next one)
    #[arg(long, value_name = "TEXT")]
    pub system_prompt: Option<String>,

    /// Persona blended into the system prompt
    #[arg(short, long, value_name = "NAME")]
    pub persona: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate one image and print its URL
    Image { prompt: String },
    /// Run one web search and print the result snippets
    Search {
        query: String,
        /// Number of results to request
        #[arg(short = 'n', long, default_value_t = DEFAULT_SEARCH_RESULTS)]
        max_results: u32,
    },
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load().unwrap_or_else(|err| {
        tracing::warn!("could not load config, using defaults: {err}");
        Config::default()
    });

    let server_url = args
        .server_url
        .clone()
        .or_else(|| config.server_url.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let client = BackendClient::new(server_url);

    match &args.command {
        Some(Commands::Image { prompt }) => {
            let url = client.generate_image(prompt).await?;
            println!("{url}");
            Ok(())
        }
        Some(Commands::Search { query, max_results }) => {
            for snippet in client.search(query, *max_results).await? {
                println!("{snippet}");
            }
            Ok(())
        }
        None => run_chat(client, &args, &config).await,
    }
}

async fn run_chat(client: BackendClient, args: &Args, config: &Config) -> Result<(), Box<dyn Error>> {
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new()?);
    let model = args
        .model
        .clone()
        .or_else(|| config.default_model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let mut session = ChatSession::new(client, storage, model);
    session.set_temperature(
        args.temperature
            .or(config.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE),
    );
    session.set_use_search(args.search);
    if let Some(prompt) = &args.system_prompt {
        session.set_system_prompt(prompt.clone());
    }
    if let Some(persona) = &args.persona {
        session.set_persona(Persona::parse(persona));
    }
    let mode = if args.no_stream || config.stream == Some(false) {
        DeliveryMode::Buffered
    } else {
        DeliveryMode::Streamed
    };

    for entry in session.transcript().snapshot() {
        print_entry(&entry);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear_transcript();
                println!("Transcript cleared.");
            }
            _ if line.starts_with("/persona") => {
                let name = line.trim_start_matches("/persona").trim();
                if name.is_empty() {
                    println!("Persona: {}", session.preferences().persona.id());
                } else {
                    session.set_persona(Persona::parse(name));
                    println!("Persona set to {}.", session.preferences().persona.id());
                }
            }
            _ if line.starts_with("/system") => {
                session.set_system_prompt(line.trim_start_matches("/system").trim().to_string());
                println!("System prompt updated.");
            }
            _ => run_turn(&mut session, line, mode).await,
        }
    }
    Ok(())
}

async fn run_turn(session: &mut ChatSession, utterance: &str, mode: DeliveryMode) {
    let before = session.transcript().len();
    match mode {
        DeliveryMode::Streamed => {
            let echo = spawn_live_echo(session.transcript().clone(), session.subscribe_status());
            session.send_turn(utterance, mode).await;
            let _ = echo.await;
            println!();
        }
        DeliveryMode::Buffered => {
            session.send_turn(utterance, mode).await;
            // A buffered turn may have rewritten history wholesale;
            // everything past the echoed user entry is new output.
            for entry in session.transcript().snapshot().iter().skip(before + 1) {
                print_entry(entry);
            }
        }
    }
}

/// Mirror the growth of the turn's assistant entry to stdout while the
/// stream is in flight; exits once the session settles back to idle.
fn spawn_live_echo(
    transcript: TranscriptStore,
    mut status: watch::Receiver<TurnStatus>,
) -> tokio::task::JoinHandle<()> {
    let mut revisions = transcript.subscribe();
    tokio::spawn(async move {
        let mut sink = None;
        let mut printed = 0usize;
        loop {
            tokio::select! {
                changed = revisions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    echo_growth(&transcript, &mut sink, &mut printed);
                }
                changed = status.changed() => {
                    if changed.is_err() || *status.borrow() == TurnStatus::Idle {
                        echo_growth(&transcript, &mut sink, &mut printed);
                        break;
                    }
                }
            }
        }
    })
}

fn echo_growth(transcript: &TranscriptStore, sink: &mut Option<usize>, printed: &mut usize) {
    let entries = transcript.snapshot();
    let Some(last) = entries.len().checked_sub(1) else {
        return;
    };
    let entry = &entries[last];
    if entry.role != Role::Assistant {
        return;
    }
    if *sink != Some(last) {
        *sink = Some(last);
        *printed = 0;
    }
    if entry.content.len() > *printed {
        print!("{}", &entry.content[*printed..]);
        let _ = std::io::stdout().flush();
        *printed = entry.content.len();
    }
}

fn print_entry(entry: &ConversationEntry) {
    if !entry.role.is_renderable() {
        return;
    }
    match entry.role {
        Role::User => println!("you: {}", entry.content),
        _ => println!("{}", entry.content),
    }
}
