// feedsync - catalog feed reconciliation CLI

mod exit_codes;
mod sync;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use feedsync_config::{Settings, SettingsError};
use feedsync_io::IoError;

use exit_codes::{EXIT_INVALID_CONFIG, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "feedsync")]
#[command(about = "Diff product feeds into catalog upload files")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/feedsync/settings.json)
    #[arg(long, global = true, env = "FEEDSYNC_SETTINGS")]
    settings: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "feedsync_recon=debug" (RUST_LOG wins)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile an incoming feed against the master feed and write upload files
    #[command(after_help = "\
Examples:
  feedsync diff plytix_feed.csv MASTER_plytix_feed.csv
  feedsync diff new.csv master.csv --out-dir upload --json
  feedsync diff new.csv master.csv --config sync.toml --exit-code")]
    Diff {
        /// Incoming feed (new upstream state)
        incoming: PathBuf,

        /// Master feed (last synced state)
        master: PathBuf,

        /// Directory for the upload files
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Sync config TOML (views, schema, metafields)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output JSON result to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON result to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit with code 6 when any change is found
        #[arg(long)]
        exit_code: bool,
    },

    /// Run the full sync against the configured store
    #[command(after_help = "\
Examples:
  feedsync run
  feedsync run --settings /etc/feedsync/settings.json --json")]
    Run {
        /// Sync config TOML (overrides sync.config from settings)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output JSON result to stdout
        #[arg(long)]
        json: bool,
    },

    /// Print catalog mutation plans for upload files as JSON
    #[command(after_help = "\
Examples:
  feedsync plan product_for_upload.csv
  feedsync plan product_for_upload.csv --metafields metafield_for_upload.csv")]
    Plan {
        /// Product upload CSV
        products: PathBuf,

        /// Metafield upload CSV
        #[arg(long)]
        metafields: Option<PathBuf>,

        /// Sync config TOML (schema, product fields, metafield types)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a sync config without running
    #[command(after_help = "\
Examples:
  feedsync validate sync.toml")]
    Validate {
        /// Sync config TOML
        config: PathBuf,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let code = match &err {
            IoError::Io { .. } => EXIT_IO,
            IoError::Csv { .. } => EXIT_PARSE,
            IoError::InvalidName(_) => EXIT_USAGE,
        };
        Self { code, message: err.to_string(), hint: None }
    }
}

fn load_settings(path: Option<&PathBuf>) -> (Settings, Option<SettingsError>) {
    match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

/// Install the log subscriber. RUST_LOG wins over `--log`, which wins
/// over the settings file.
fn init_logging(flag: Option<&str>, settings: &Settings) {
    let fallback = flag.unwrap_or(&settings.log_filter);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (settings, fallback) = load_settings(cli.settings.as_ref());
    init_logging(cli.log.as_deref(), &settings);
    if let Some(err) = fallback {
        log::warn!("{err}; using default settings");
    }

    let result = match cli.command {
        Commands::Diff {
            incoming,
            master,
            out_dir,
            config,
            json,
            output,
            exit_code,
        } => sync::cmd_diff(
            &settings,
            sync::DiffArgs { incoming, master, out_dir, config, json, output, exit_code },
        ),
        Commands::Run { config, json } => sync::cmd_run(&settings, config, json),
        Commands::Plan { products, metafields, config } => {
            sync::cmd_plan(&settings, products, metafields, config)
        }
        Commands::Validate { config } => sync::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
