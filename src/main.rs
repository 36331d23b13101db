//! chatline: terminal chat client for the inference backend.
//!
//! ```text
//!   stdin ──▶ REPL ──send_turn──▶ ChatClient ──▶ Dispatcher ──▶ backend /chat
//!               │                     │
//!               │                     └── HealthMonitor ──▶ backend /health
//!               │
//!               ├── /status /errors /history /voice /login /logout /quit
//!               └── ConfigWatcher ──apply_config──▶ ChatClient
//! ```
//!
//! Turns are spawned, so several can be in flight at once and the prompt
//! stays responsive while the client retries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use chatline::chat::{StaticIdentity, TurnInput, UserIdentity};
use chatline::config::watcher::ConfigWatcher;
use chatline::conversation::{Author, VirtualizedView};
use chatline::lifecycle::signals::spawn_signal_handler;
use chatline::lifecycle::startup::{init_observability, load_startup_config, Overrides};
use chatline::lifecycle::Shutdown;
use chatline::transport::VoicePayload;
use chatline::ChatClient;

/// Rows per screen when paging `/history`.
const HISTORY_ROWS: f64 = 10.0;

#[derive(Parser, Debug)]
#[command(name = "chatline")]
#[command(about = "Resilient terminal chat client", long_about = None)]
struct Cli {
    /// TOML config file; watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the config file).
    #[arg(short, long)]
    backend: Option<String>,

    /// Log level (overrides the config file; RUST_LOG wins over both).
    #[arg(long)]
    log_level: Option<String>,

    /// Wallet address to sign in with.
    #[arg(short, long)]
    wallet: Option<String>,

    #[arg(short, long, default_value = "guest")]
    username: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = Overrides {
        backend_url: cli.backend.clone(),
        log_level: cli.log_level.clone(),
    };
    let config = load_startup_config(cli.config.as_deref(), &overrides)?;
    init_observability(&config);

    tracing::info!(
        backend = %config.backend.base_url,
        max_concurrent = config.dispatcher.max_concurrent,
        max_queue_size = config.dispatcher.max_queue_size,
        "Configuration loaded"
    );

    let identity = StaticIdentity::new(cli.wallet.clone().map(|wallet_address| UserIdentity {
        wallet_address,
        username: cli.username.clone(),
    }));
    let client = Arc::new(ChatClient::connect(&config, Arc::new(identity.clone()))?);

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    // Keep the watcher alive for the whole session.
    let _watcher = match &cli.config {
        Some(path) => start_config_watcher(path, client.clone(), shutdown.clone()),
        None => None,
    };

    println!("chatline session {} (type /help)", client.session_id());
    if cli.wallet.is_none() {
        println!("Not signed in. Use /login <wallet> [name] before chatting.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stop = shutdown.subscribe();
    let settings = client.window_settings();
    let mut view = VirtualizedView::new(settings, HISTORY_ROWS * settings.item_height);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = stop.recv() => break,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command {
            "/quit" | "/exit" => break,
            "/help" => print_help(),
            "/status" => {
                let stats = client.diagnostics();
                println!(
                    "backend: {} | in flight: {}/{} | queued: {}/{} | cooldown: {}",
                    stats.connection,
                    stats.dispatcher.active,
                    stats.dispatcher.max_concurrent,
                    stats.dispatcher.queued,
                    stats.dispatcher.max_queue_size,
                    stats.rate_limit.in_cooldown,
                );
            }
            "/errors" => match serde_json::to_string_pretty(&client.diagnostics()) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("diagnostics unavailable: {}", e),
            },
            "/history" => {
                let messages = client.conversation();
                view.on_length_change(messages.len());
                let window = if rest.is_empty() {
                    view.scroll_to_end()
                } else {
                    match rest.parse::<usize>() {
                        Ok(row) => {
                            view.on_scroll(row as f64 * client.window_settings().item_height)
                        }
                        Err(_) => {
                            println!("usage: /history [row]");
                            continue;
                        }
                    }
                };
                let Some(window) = window else {
                    println!("(no messages yet)");
                    continue;
                };
                if window.windowed {
                    println!("... {} earlier", window.start);
                }
                for (offset, message) in view.slice(&messages).iter().enumerate() {
                    let who = match message.author {
                        Author::User => "you",
                        Author::System => "bot",
                    };
                    println!("{:>4} {}: {}", window.start + offset, who, message.content);
                }
                if window.windowed && window.end + 1 < messages.len() {
                    println!("... {} later", messages.len() - window.end - 1);
                }
            }
            "/login" => {
                let mut parts = rest.split_whitespace();
                match parts.next() {
                    Some(wallet) => {
                        let username = parts.next().unwrap_or(&cli.username).to_string();
                        identity.set(Some(UserIdentity {
                            wallet_address: wallet.to_string(),
                            username,
                        }));
                        println!("Signed in as {}", wallet);
                    }
                    None => println!("usage: /login <wallet> [name]"),
                }
            }
            "/logout" => {
                identity.set(None);
                println!("Signed out");
            }
            "/voice" => {
                if rest.is_empty() {
                    println!("usage: /voice <audio file>");
                    continue;
                }
                match read_voice(Path::new(rest)).await {
                    Ok(audio) => spawn_turn(client.clone(), TurnInput::Voice(audio)),
                    Err(e) => eprintln!("could not read {}: {}", rest, e),
                }
            }
            _ if command.starts_with('/') => println!("unknown command {} (type /help)", command),
            _ => spawn_turn(client.clone(), TurnInput::text(line)),
        }
    }

    shutdown.trigger();
    client.dispose();
    tracing::info!("Shutdown complete");
    Ok(())
}

fn spawn_turn(client: Arc<ChatClient>, input: TurnInput) {
    tokio::spawn(async move {
        match client.send_turn(input).await {
            Ok(reply) => {
                println!("bot: {}", reply.content);
                if let Some(url) = reply.audio_url {
                    println!("     audio: {}", url);
                }
            }
            Err(e) => println!("!! {}", e.message),
        }
    });
}

fn start_config_watcher(
    path: &Path,
    client: Arc<ChatClient>,
    shutdown: Shutdown,
) -> Option<notify::RecommendedWatcher> {
    let (watcher, mut updates) = ConfigWatcher::new(path);
    let handle = match watcher.run() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
            return None;
        }
    };

    tokio::spawn(async move {
        let mut stop = shutdown.subscribe();
        loop {
            tokio::select! {
                Some(config) = updates.recv() => client.apply_config(&config),
                _ = stop.recv() => break,
                else => break,
            }
        }
    });
    Some(handle)
}

async fn read_voice(path: &Path) -> std::io::Result<VoicePayload> {
    let bytes = tokio::fs::read(path).await?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let content_type = match extension.as_deref() {
        Some("webm") => "audio/webm",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    };
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio.webm")
        .to_string();
    Ok(VoicePayload::new(bytes, content_type).with_filename(filename))
}

fn print_help() {
    println!("/status              connection and dispatcher state");
    println!("/errors              diagnostics (recent errors, rate limiter)");
    println!("/history [row]       show conversation, optionally from a row");
    println!("/voice <file>        send an audio file as a voice turn");
    println!("/login <wallet> [n]  sign in");
    println!("/logout              sign out");
    println!("/quit                exit");
}
