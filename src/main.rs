mod cli;
mod commands;
mod config;
mod model;
mod store;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, IngestArgs};
use crate::config::load_config;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        None => commands::ingest::run(&config, IngestArgs::default()),
        Some(Commands::Ingest(args)) => commands::ingest::run(&config, args),
        Some(Commands::Project(args)) => commands::project::run(&config, args),
        Some(Commands::Extremes(args)) => commands::extremes::run(&config, args),
        Some(Commands::Status) => commands::status::run(&config),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
