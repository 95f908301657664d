mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, faults::FaultsSubcommand, triggers::TriggersSubcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "triggerd",
    about = "Reactive trigger engine for sensor telemetry",
    version,
    propagate_version = true
)]
struct Cli {
    /// Data root (default: auto-detect from .triggerd/)
    #[arg(long, global = true, env = triggerd_core::paths::ROOT_ENV)]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .triggerd/ with a default config and an empty store
    Init {
        /// Also load the default climate-control triggers
        #[arg(long)]
        seed: bool,
    },

    /// Run the trigger engine and its HTTP API
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Manage stored triggers
    Triggers {
        #[command(subcommand)]
        subcommand: TriggersSubcommand,
    },

    /// Inspect recorded faults
    Faults {
        #[command(subcommand)]
        subcommand: FaultsSubcommand,
    },

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Run readings from a JSONL file through the stored triggers and print
    /// the effects instead of performing them
    Replay {
        /// JSONL file with one reading per line ('-' for stdin)
        file: PathBuf,
        /// Use the default trigger catalog instead of the store
        #[arg(long)]
        defaults: bool,
    },
}

fn configured_log_level(root: &Path) -> Option<String> {
    if std::env::var_os("RUST_LOG").is_some() {
        return None;
    }
    triggerd_core::config::Config::load_or_default(root)
        .ok()
        .and_then(|c| c.log.level)
}

fn main() {
    let cli = Cli::parse();
    let root = root::resolve_root(cli.root.as_deref());

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    let filter = match configured_log_level(&root) {
        Some(directive) => tracing_subscriber::EnvFilter::new(directive),
        None => tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(default_level.into()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Init { seed } => cmd::init::run(&root, seed, cli.json),
        Commands::Serve { bind } => cmd::serve::run(&root, bind),
        Commands::Triggers { subcommand } => cmd::triggers::run(&root, subcommand, cli.json),
        Commands::Faults { subcommand } => cmd::faults::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Replay { file, defaults } => cmd::replay::run(&root, &file, defaults, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
