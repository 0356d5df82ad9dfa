mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use pmo_core::config::Config;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "pmo",
    about = "Turn agent-runtime hook events into tracking records",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ~/.claude/pmo.yaml)
    #[arg(long, global = true, env = "PMO_CONFIG")]
    config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, env = "PMO_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one hook payload from stdin and record it
    Hook {
        /// Consult only this adapter (default: all, first match wins)
        adapter: Option<String>,

        /// Use an in-memory store and never spawn the agent
        #[arg(long)]
        dry_run: bool,
    },

    /// Route one event JSON from stdin through the in-process handlers
    Event {
        /// Use an in-memory store instead of the remote tracker
        #[arg(long)]
        dry_run: bool,
    },

    /// List records correlated with a session
    Search {
        #[arg(long)]
        session: String,

        /// Business unit whose team is searched
        #[arg(long, default_value = "product")]
        unit: String,

        /// Maximum number of candidates (default: remote.search_limit)
        #[arg(long)]
        limit: Option<u32>,

        /// Output as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Create, inspect or validate the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    // A broken config is reported by the command itself; here it only
    // decides where logs go.
    let log_file = cli.log_file.clone().or_else(|| {
        Config::resolve(cli.config.as_deref())
            .ok()
            .and_then(|c| c.log_file)
    });
    init_logging(log_file.as_deref());

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Hook { adapter, dry_run } => cmd::hook::run(config_path, adapter.as_deref(), dry_run),
        Commands::Event { dry_run } => cmd::event::run(config_path, dry_run),
        Commands::Search {
            session,
            unit,
            limit,
            json,
        } => cmd::search::run(config_path, &session, &unit, limit, json),
        Commands::Config { subcommand } => cmd::config::run(config_path, subcommand),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

/// Logs go to stderr (stdout carries the one-line result) or, when a log
/// file is configured, are appended to it without colour.
fn init_logging(log_file: Option<&Path>) {
    let filter = || {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::WARN.into())
    };

    let file = log_file.and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(pmo_core::paths::expand_home(path))
            .map_err(|e| eprintln!("warning: cannot open log file {}: {e}", path.display()))
            .ok()
    });

    match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(false)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
    }
}
