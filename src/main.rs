mod clipboard;
mod config;
mod controller;
mod generate;
mod markup;
mod session;
mod store;
mod stream;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::session::SessionManager;
use crate::store::{DirStore, SessionStore};
use crate::ui::ChatApp;

#[derive(Parser)]
#[command(name = "palaver")]
#[command(about = "Terminal chat client with persistent conversations")]
#[command(version)]
struct Cli {
    /// Prefill the input box with this message
    #[arg(short, long)]
    message: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved conversations and exit
    Sessions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_logging(&config)?;

    match cli.command {
        Some(Commands::Sessions) => list_sessions(config),
        None => {
            let mut app = ChatApp::new(config, cli.message);
            app.run().await
        }
    }
}

/// Log to a file under the data directory; the terminal is owned by the UI.
fn init_logging(config: &Config) -> Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.data_dir.join("palaver.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn list_sessions(config: Config) -> Result<()> {
    let store = SessionStore::new(Box::new(DirStore::new(config.state_dir())));
    let sessions = SessionManager::new(store);

    if sessions.session_count() == 0 {
        println!("No saved conversations.");
        return Ok(());
    }

    for summary in sessions.list_sessions() {
        let marker = if summary.is_active { "*" } else { " " };
        println!(
            "{marker} {title:<53} {date:<12} {count} messages",
            title = summary.title,
            date = ui::picker::relative_date(summary.timestamp),
            count = summary.message_count,
        );
    }
    Ok(())
}
