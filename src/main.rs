//! initrack - initiative and combat status tracker

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use initrack::repl::Repl;
use initrack::tracker::ThreadRoller;
use initrack::{Config, FileStore, Session};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initiative and combat status tracker
#[derive(Parser, Debug)]
#[command(
    name = "initrack",
    version,
    about = "Track initiative and combat status for a tabletop encounter"
)]
struct Args {
    /// Configuration file (defaults to ./initrack.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot file used by save and load
    #[arg(long)]
    save_file: Option<PathBuf>,

    /// File the action log is appended to on export
    #[arg(long)]
    export_file: Option<PathBuf>,

    /// Do not ask for confirmation before removing or loading
    #[arg(short, long)]
    yes: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = args.save_file {
        config.save_file = path;
    }
    if let Some(path) = args.export_file {
        config.log_export_file = path;
    }

    // Initialize tracing; stdout belongs to the REPL
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("initrack={}", config.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    info!(save_file = %config.save_file.display(), "initrack starting");

    let session = Session::with_roller(config.limits(), ThreadRoller);
    let stdin = std::io::stdin();
    let mut repl = Repl::new(
        session,
        FileStore::new(config.save_file),
        FileStore::new(config.log_export_file),
        stdin.lock(),
        std::io::stdout(),
    )
    .assume_yes(args.yes);

    repl.run().context("terminal i/o failed")?;
    Ok(())
}
