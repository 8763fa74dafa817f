//! pakechat - password-authenticated end-to-end encrypted room chat
//!
//! Joins a room on a chat server, proves knowledge of the room password with
//! a PAKE handshake and exchanges messages encrypted under a key derived from
//! that password.

mod commands;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use commands::{ChatCommand, CommandExecutor, GenSaltCommand};

/// pakechat - end-to-end encrypted room chat
///
/// Runs the chat client when no subcommand is given.
#[derive(Parser)]
#[command(name = "pakechat")]
#[command(version)]
#[command(about = "Password-authenticated, end-to-end encrypted terminal chat")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    chat: ChatCommand,

    /// Write logs to this file (the terminal is owned by the UI)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a chat room (default)
    Chat(ChatCommand),

    /// Generate a random salt for SALT_MASTER
    GenSalt(GenSaltCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        setup_logging(path, &cli.log_level)?;
    }

    let command: Box<dyn CommandExecutor> = match cli.command {
        Some(Commands::Chat(cmd)) => Box::new(cmd),
        Some(Commands::GenSalt(cmd)) => Box::new(cmd),
        None => Box::new(cli.chat),
    };
    command.execute()
}

/// Install a file-backed tracing subscriber.
fn setup_logging(path: &Path, log_level: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .context("Invalid log level")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    Ok(())
}
