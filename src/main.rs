//! Tidebound - Entry Point
//!
//! Hosts one engine, starts the background sweeps and drives a single local
//! session from JSON lines on stdin. Each line is a `GameCommand`; each
//! response (and every broadcast pushed to this session) is written to
//! stdout as one JSON line.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tidebound::core::error::{GameError, Result};
use tidebound::core::types::AccountId;
use tidebound::core::EngineConfig;
use tidebound::session::{Engine, GameCommand, GameResponse, ResponseKind};
use tidebound::tick::start_scheduler;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

/// Tidebound session host
#[derive(Parser, Debug)]
#[command(name = "tidebound")]
#[command(about = "Run the game engine and play one session over JSON lines on stdin/stdout")]
struct Args {
    /// Engine configuration (TOML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Single-player save to open
    #[arg(long, default_value = "default")]
    save: String,

    /// Open an account world instead of a local save
    #[arg(long)]
    account: Option<i64>,

    /// Do not start the background sweeps
    #[arg(long)]
    no_sweeps: bool,
}

fn emit(response: &GameResponse) {
    match serde_json::to_string(response) {
        Ok(line) => {
            let mut out = io::stdout().lock();
            if writeln!(out, "{}", line).and_then(|()| out.flush()).is_err() {
                tracing::warn!("stdout closed");
            }
        }
        Err(err) => tracing::error!(%err, "could not encode response"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tidebound=info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let rt = Runtime::new()?;
    let _enter = rt.enter();
    let engine = Arc::new(Engine::in_memory(config)?);
    let scheduler = (!args.no_sweeps).then(|| start_scheduler(engine.clone()));

    let session = match args.account {
        Some(id) => engine.create_account_session(AccountId(id))?,
        None => engine.create_local_session(&args.save)?,
    };
    engine.subscribe(session, Arc::new(|response: GameResponse| emit(&response)))?;
    tracing::info!(%session, "session opened");

    emit(&engine.process_command(session, GameCommand::init()));
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<GameCommand>(&line) {
            Ok(command) => engine.process_command(session, command),
            Err(err) => GameError::from(err).to_response(None),
        };
        emit(&response);
        if response.kind == ResponseKind::Exit {
            break;
        }
    }

    if let Err(err) = engine.remove_session(&session) {
        tracing::warn!(%err, "final save failed");
    }
    if let Some(scheduler) = scheduler {
        scheduler.shutdown();
    }
    tracing::info!("goodbye");
    Ok(())
}
