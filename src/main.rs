#![forbid(unsafe_code)]

mod apply;
mod cli;
mod commands;
mod config;
mod constants;
mod error;
mod events;
mod executor;
mod failure;
mod matcher;
mod pattern;
mod plan;
mod randr;
mod reconcile;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level as TraceLevel;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use cli::{Cli, Commands};
use commands::Session;

fn init_logging(verbose: bool, logfile: Option<&Path>) -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        _ if verbose => TraceLevel::DEBUG,
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let writer = match logfile {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file)))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(writer)
        .with_ansi(logfile.is_none())
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.logfile.as_deref())?;

    match &cli.command {
        Commands::Watch => {
            let session = Session::load(&cli)?;
            session.guarded(session.watch())
        }
        Commands::Update => {
            let session = Session::load(&cli)?;
            session.guarded(session.update())
        }
        Commands::Apply { rule } => {
            let session = Session::load(&cli)?;
            session.guarded(session.apply(rule))
        }
        Commands::Show { json } => commands::runtime()?.block_on(commands::show(*json)),
        Commands::Rules => commands::rules(&cli),
        Commands::Version => {
            commands::version();
            Ok(())
        }
    }
}
