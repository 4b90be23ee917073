//! vhxt - inspect and exercise vhx variable handles.
//!
//! Parses the command line with clap, installs a tracing subscriber, loads
//! `vhxt.toml` and dispatches to the command handlers.

mod commands;
mod config;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::common::StorageArg;
use commands::{run_leak, run_modes, run_stress, LeakArgs, ModesArgs, StressArgs};
use config::Config;
use error::{Result, VhxtError};

/// vhxt - variable handle inspection and stress tool
#[derive(Parser, Debug)]
#[command(name = "vhxt")]
#[command(author = "vhx Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and exercise vhx variable handles", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, env = "VHXT_VERBOSE")]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "VHXT_CONFIG")]
    config: Option<PathBuf>,

    /// Disable color output
    #[arg(long, global = true, env = "VHXT_NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the vhxt CLI.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the supported accesses of handles
    ///
    /// Defines a probe class for each selected type and lists, for every
    /// storage kind, which of the 31 accesses its handle supports and the
    /// method type of each.
    Modes(ModesCommand),

    /// Stress a shared dispatch site from many threads
    ///
    /// Fails if any update is lost or lands on the wrong handle.
    Stress(StressCommand),

    /// Check that dispatch sites do not keep loaders alive
    ///
    /// Fails if a dropped loader is still reachable after the configured
    /// number of reclamation attempts.
    Leak(LeakCommand),
}

/// Arguments for the modes subcommand.
#[derive(Parser, Debug)]
struct ModesCommand {
    /// Element type (boolean, byte, short, char, int, long, float, double, Object, String)
    #[arg(short = 't', long = "type")]
    ty: Option<String>,

    /// Storage kind
    #[arg(short, long, value_enum)]
    storage: Option<StorageArg>,

    /// Describe final fields
    #[arg(long = "final")]
    read_only: bool,

    /// Emit JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the stress subcommand.
#[derive(Parser, Debug)]
struct StressCommand {
    /// Number of worker threads (default: from config)
    #[arg(short = 'j', long)]
    threads: Option<u32>,

    /// Accesses per worker (default: from config)
    #[arg(short = 'n', long)]
    iterations: Option<u32>,
}

/// Arguments for the leak subcommand.
#[derive(Parser, Debug)]
struct LeakCommand {
    /// Loaders to define and drop (default: from config)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    rounds: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.no_color)?;

    let config = load_config(cli.config.as_deref())?;

    execute_command(cli.command, cli.verbose, config)
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` overrides the level chosen by `--verbose`. Records from the
/// runtime's `log` facade are forwarded to the same subscriber.
fn init_logging(verbose: bool, no_color: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .map_err(|e| VhxtError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(config_path: Option<&std::path::Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

/// Execute the selected command.
fn execute_command(command: Commands, verbose: bool, config: Config) -> Result<()> {
    let runtime = vhx_rt::init_with_config(config.vh_config(verbose)?)?;
    tracing::debug!("runtime {} ready: {:?}", vhx_rt::VERSION, runtime.config());

    match command {
        Commands::Modes(args) => run_modes(
            ModesArgs {
                ty: args.ty,
                storage: args.storage,
                read_only: args.read_only,
                json: args.json,
            },
            &runtime,
        ),
        Commands::Stress(args) => run_stress(
            StressArgs {
                threads: args.threads,
                iterations: args.iterations,
            },
            config.stress,
            &runtime,
        ),
        Commands::Leak(args) => run_leak(LeakArgs { rounds: args.rounds }, config.leak, &runtime),
    }
}
