//! modelferry CLI - fetch and verify model weights
//!
//! ```text
//! modelferry fetch bunny-v1.1-llama-3.2-4b bunny-mmproj
//! modelferry list --json
//! modelferry checksum model.gguf
//! modelferry verify model.gguf <sha256>
//! ```

mod commands;
mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use config::CliConfig;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "modelferry", version, about = "Resumable, verified model downloads")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: <config dir>/modelferry/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory models are stored in
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download artifacts that are not already present
    Fetch {
        /// Artifact names (see `list`)
        #[arg(required = true)]
        names: Vec<String>,

        /// Attempts per artifact
        #[arg(long)]
        retries: Option<u32>,
    },
    /// List registered artifacts
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print where an artifact is stored
    Path { name: String },
    /// Show free disk space
    Disk {
        /// Directory to check (default: the model directory)
        path: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
    /// Write `.sha256` sidecar files
    Checksum {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write one combined manifest instead of per-file sidecars
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Verify a file against an expected SHA-256
    Verify { file: PathBuf, sha256: String },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "modelferry=warn",
        1 => "modelferry=info",
        _ => "modelferry=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.model_dir {
        config.model_dir = dir;
    }
    debug!(model_dir = %config.model_dir.display(), "Loaded configuration");

    match cli.command {
        Commands::Fetch { names, retries } => {
            if let Some(retries) = retries.filter(|r| *r > 0) {
                config.max_retries = retries;
            }
            fetch(&config, names)
        }
        Commands::List { json } => {
            let manager = commands::build_manager(&config)?;
            commands::list::run(&manager, json)
        }
        Commands::Path { name } => {
            let manager = commands::build_manager(&config)?;
            commands::list::run_path(&manager, &name)
        }
        Commands::Disk { path, json } => {
            let target = path.unwrap_or_else(|| config.model_dir.clone());
            commands::disk::run(&target, json)
        }
        Commands::Checksum { files, manifest } => {
            commands::checksum::run(&files, manifest.as_deref())
        }
        Commands::Verify { file, sha256 } => commands::checksum::run_verify(&file, &sha256),
    }
}

fn fetch(config: &CliConfig, names: Vec<String>) -> Result<(), CliError> {
    let manager = Arc::new(commands::build_manager(config)?);

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, cancelling downloads");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(commands::fetch::run(manager, names, cancel))
}
