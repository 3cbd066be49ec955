//! cascata CLI - incremental OHLCV aggregation and cascaded resampling.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

#[derive(Parser)]
#[command(name = "cascata")]
#[command(about = "Incremental OHLCV bar aggregation and cascaded resampling", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run configuration file
    #[arg(short, long, default_value = "cascata.json", global = true)]
    config: PathBuf,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only, no progress output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume new day files and advance every series incrementally
    Run,

    /// Delete derived series and recompute them from the day files
    Rebuild {
        /// Rebuild only this symbol
        #[arg(short, long)]
        symbol: Option<String>,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show the committed state of every configured series
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Run => commands::run::run(&cli.config, cli.threads, cli.quiet),
        Commands::Rebuild { symbol, yes } => {
            commands::rebuild::rebuild(&cli.config, symbol.as_deref(), cli.threads, yes, cli.quiet)
        }
        Commands::Status => commands::status::status(&cli.config),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}
