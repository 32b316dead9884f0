//! Command-line interface and the interactive REPL.

use crate::config::Config;
use crate::controller::{ChatController, ChatEvent};
use crate::rag::fetch_rag_tags;
use crate::session::{DiskKv, Role, SessionId, SessionStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "ragline", version, about = "Streaming chat client for RAG generation services")]
pub struct Cli {
    /// Base URL of the generation service.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Backend path segment (e.g. ollama, openai).
    #[arg(long)]
    pub provider: Option<String>,

    /// Model identifier.
    #[arg(long)]
    pub model: Option<String>,

    /// Knowledge-base tag; selects the retrieval-augmented endpoint.
    #[arg(long)]
    pub rag_tag: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the knowledge-base tags known to the service.
    Tags,
    /// List stored chat sessions.
    Sessions,
}

impl Cli {
    /// Overlay command-line flags onto the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(provider) = &self.provider {
            config.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
    }
}

pub async fn run_tags(config: &Config) -> Result<()> {
    let client = reqwest::Client::new();
    let tags = fetch_rag_tags(&client, &config.base_url)
        .await
        .context("Failed to fetch knowledge-base tags")?;

    if tags.is_empty() {
        println!("No knowledge-base tags uploaded.");
        return Ok(());
    }
    for tag in tags {
        println!("{tag}");
    }
    Ok(())
}

pub async fn run_sessions(config: &Config) -> Result<()> {
    let kv = DiskKv::open(config.sessions_dir())?;
    let store = SessionStore::open(Box::new(kv))?;
    let active = store.load_active_pointer();

    if store.is_empty() {
        println!("No stored sessions.");
        return Ok(());
    }
    for summary in crate::session::summaries(&store.list(active.as_ref())) {
        let marker = if Some(summary.id) == active { "*" } else { " " };
        println!(
            "{marker} {}  {}  ({} messages, {})",
            summary.id, summary.name, summary.message_count, summary.created
        );
    }
    Ok(())
}

/// Interactive loop. Plain text is submitted to the active session; lines
/// starting with `/` are commands.
pub async fn run_repl(config: &Config, rag_tag: Option<String>) -> Result<()> {
    let mut controller = ChatController::from_config(config)?;
    controller.set_rag_tag(rag_tag);

    println!(
        "ragline — {} via {} ({})",
        config.model, config.provider, config.base_url
    );
    println!("Commands: /new /list /open <id> /rename <id> <name> /delete <id> /tag <tag|off> /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&controller);
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            if !handle_command(&mut controller, command) {
                break;
            }
            continue;
        }

        controller.submit(line);
        stream_response(&mut controller).await;
    }

    Ok(())
}

fn prompt(controller: &ChatController) {
    let tag = controller
        .options()
        .rag_tag
        .as_deref()
        .map(|t| format!(" [{t}]"))
        .unwrap_or_default();
    print!("you{tag}> ");
    let _ = std::io::stdout().flush();
}

/// Returns false when the loop should exit.
fn handle_command(controller: &mut ChatController, command: &str) -> bool {
    let mut parts = command.splitn(2, ' ');
    let name = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    match name {
        "quit" | "q" => return false,
        "new" => {
            let id = controller.new_chat();
            println!("Started chat {id}");
        }
        "list" => {
            let active = controller.active_session();
            for summary in controller.sessions() {
                let marker = if Some(summary.id) == active { "*" } else { " " };
                println!(
                    "{marker} {}  {}  ({} messages)",
                    summary.id, summary.name, summary.message_count
                );
            }
        }
        "open" => {
            let loaded = rest
                .parse::<SessionId>()
                .ok()
                .filter(|id| controller.load_chat(*id));
            match loaded.and_then(|id| controller.transcript(id)) {
                Some(record) => {
                    println!("— {} —", record.name);
                    for message in &record.messages {
                        let who = match message.role {
                            Role::User => "you",
                            Role::Assistant => "assistant",
                        };
                        println!("{who}: {}", message.content);
                    }
                }
                None => println!("No such session: {rest}"),
            }
        }
        "rename" => {
            let mut args = rest.splitn(2, ' ');
            match (
                args.next().unwrap_or_default().parse::<SessionId>(),
                args.next(),
            ) {
                (Ok(id), Some(name)) => controller.rename_chat(id, name),
                _ => println!("Usage: /rename <id> <name>"),
            }
        }
        "delete" => match rest.parse::<SessionId>() {
            Ok(id) => controller.delete_chat(id),
            Err(_) => println!("Usage: /delete <id>"),
        },
        "tag" => {
            if rest == "off" || rest.is_empty() {
                controller.set_rag_tag(None);
                println!("Knowledge-base tag cleared.");
            } else {
                controller.set_rag_tag(Some(rest.to_string()));
                println!("Using knowledge-base tag '{rest}'.");
            }
        }
        other => println!("Unknown command: /{other}"),
    }
    true
}

/// Print the in-flight response as it accumulates, until the stream
/// completes or closes.
async fn stream_response(controller: &mut ChatController) {
    let streaming_for = controller.active_session();
    let mut printed = 0usize;
    let mut completed = false;

    while let Some(event) = controller.next_event().await {
        match event {
            ChatEvent::Update { session_id, text } if Some(session_id) == streaming_for => {
                // Updates carry the full accumulated text; print the suffix.
                print!("{}", &text[printed..]);
                let _ = std::io::stdout().flush();
                printed = text.len();
            }
            ChatEvent::Update { .. } => {}
            ChatEvent::Complete { .. } => {
                println!();
                completed = true;
                break;
            }
            ChatEvent::SessionListChanged(_) => {}
        }
    }

    if !completed {
        println!("\n(stream closed without a response)");
    }
}
