//! # escrow CLI entry point
//!
//! Parses command-line arguments, resolves configuration, installs the
//! tracing subscriber, and dispatches to the subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use escrow_cli::{run_escrow, CliConfig, EscrowCommand, LogFormat, StateStore};

/// Three-party escrow: client deposits, solicitor works, arbitrator decides
/// disputes. Funds leave custody exactly once.
#[derive(Parser, Debug)]
#[command(name = "escrow", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// State directory (overrides config and ESCROW_STATE_DIR).
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Log format (overrides config and ESCROW_LOG_FORMAT).
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: EscrowCommand,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config.with_overrides(cli.state_dir, cli.log_format),
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::from(1);
        }
    };

    init_tracing(cli.verbose, config.log_format);
    tracing::debug!(state_dir = %config.state_dir.display(), "escrow CLI starting");

    let store = StateStore::new(config.state_dir);
    match run_escrow(&cli.command, &store) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// Map `-v` repetitions to a filter; `RUST_LOG` wins when set.
fn init_tracing(verbose: u8, format: LogFormat) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
