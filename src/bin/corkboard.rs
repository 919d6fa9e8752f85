//! Corkboard CLI — connect any two topics, one round at a time.
//!
//! Usage:
//!   corkboard "dolphins" "the pyramids" [--rounds N] [--db PATH] [--durable]
//!
//! Runs a session with the built-in offline providers. Real search, LLM,
//! and vision adapters plug in through the library's provider traits.

use clap::Parser;
use corkboard::provider::{OfflineExtractor, OfflineSearch, StdoutProgress};
use corkboard::{OpenStore, Session, SessionRunner, SessionState, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "corkboard",
    version,
    about = "Round-based conspiracy graph engine"
)]
struct Cli {
    /// First topic to investigate
    topic_a: String,
    /// Second topic to investigate
    topic_b: String,
    /// Number of investigation rounds
    #[arg(long, default_value_t = 3)]
    rounds: u32,
    /// Persist the board to this SQLite database
    #[arg(long)]
    db: Option<PathBuf>,
    /// Treat storage failure as fatal instead of degrading to memory-only.
    /// Implies persistence at the default database path when --db is absent.
    #[arg(long)]
    durable: bool,
    /// Evidence context budget (characters) replayed into each round
    #[arg(long, default_value_t = corkboard::DEFAULT_MAX_CONTEXT_CHARS)]
    max_context: usize,
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Default database path (~/.local/share/corkboard/boards.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("corkboard").join("boards.db")
}

fn print_report(session: &Session) {
    let snapshot = session.board.snapshot();
    println!("\n==================================================");
    println!("  CONSPIRACY COMPLETE");
    println!("==================================================");
    println!("  session:       {}", session.id);
    println!("  rounds run:    {}", session.round_number);
    println!("  entities:      {}", snapshot.entities.len());
    println!("  connections:   {}", snapshot.relationships.len());
    println!("  noise dropped: {}", session.skipped.total());
    println!("  intensity:     {:.2}", session.intensity);

    let mut strongest: Vec<_> = snapshot.relationships.iter().collect();
    strongest.sort_by(|a, b| b.weight.cmp(&a.weight));
    if !strongest.is_empty() {
        println!("\n  Top connections:");
        for rel in strongest.iter().take(5) {
            println!(
                "    {} -> {}: {} (w{})",
                rel.source, rel.target, rel.description, rel.weight
            );
        }
    }
    for note in &session.notes {
        println!("  [clue] {}", note);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut runner = SessionRunner::new(
        Arc::new(OfflineSearch::new()),
        Arc::new(OfflineExtractor::new()),
    )
    .with_progress(Arc::new(StdoutProgress::new()))
    .with_max_context_chars(cli.max_context);

    if cli.db.is_some() || cli.durable {
        let path = cli.db.clone().unwrap_or_else(default_db_path);
        match SqliteStore::open(&path) {
            Ok(store) => {
                runner = runner.with_store(Arc::new(store), cli.durable);
            }
            Err(e) if cli.durable => {
                eprintln!("Error: cannot open database {}: {}", path.display(), e);
                std::process::exit(1);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "running without persistence");
            }
        }
    }

    match runner.run(&cli.topic_a, &cli.topic_b, cli.rounds).await {
        Ok(session) => {
            print_report(&session);
            if let SessionState::Failed { reason } = &session.state {
                eprintln!("Error: session failed: {}", reason);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}
