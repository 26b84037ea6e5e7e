//! # Confluence Ledger CLI (`cledger`)
//!
//! ## Usage
//!
//! ```bash
//! cledger --config ./config/cledger.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cledger run` | Extract all spaces, write snapshots, archive old weeks |
//! | `cledger prune` | Archive weekly snapshots beyond the retention limit |
//! | `cledger snapshots` | List current, history, weekly and archived files |
//! | `cledger week` | Print the current ISO week id and its dates |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use confluence_ledger::config;
use confluence_ledger::pipeline::{self, RunOptions};
use confluence_ledger::progress::ProgressMode;
use confluence_ledger::snapshot::{WeekId, WeekInfo};
use confluence_ledger::status;

/// Confluence Ledger: weekly metadata snapshots of Confluence spaces.
///
/// Credentials are read from `CONFLUENCE_EMAIL` and `CONFLUENCE_API_TOKEN`;
/// everything else comes from the TOML file given with `--config`.
#[derive(Parser)]
#[command(
    name = "cledger",
    about = "Confluence Ledger: weekly metadata snapshots of Confluence spaces",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cledger.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every configured space and persist the snapshot.
    ///
    /// Writes the current snapshot, the weekly snapshot and the history
    /// ledger, then archives weekly snapshots beyond the retention limit.
    Run {
        /// Process only this space (repeatable). Defaults to the configured list.
        #[arg(long = "space")]
        spaces: Vec<String>,

        /// Week id to file the snapshot under (YYYY-Wnn). Defaults to the current week.
        #[arg(long)]
        week: Option<WeekId>,

        /// Extract and report counts without writing any file.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr.
        #[arg(long, value_enum, default_value = "auto")]
        progress: ProgressMode,
    },

    /// Archive weekly snapshots beyond the retention limit.
    Prune,

    /// List persisted snapshot artifacts.
    Snapshots,

    /// Print the current ISO week id with its Monday and Sunday.
    Week,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Week = cli.command {
        let info = WeekInfo::for_week(WeekId::current())?;
        println!("{}  {} .. {}", info.id, info.start, info.end);
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            spaces,
            week,
            dry_run,
            progress,
        } => {
            let reporter = progress.reporter();
            let options = RunOptions {
                spaces,
                week,
                dry_run,
            };
            pipeline::run_extract(&cfg, options, reporter.as_ref()).await?;
        }
        Commands::Prune => {
            pipeline::run_prune(&cfg)?;
        }
        Commands::Snapshots => {
            status::run_snapshots(&cfg)?;
        }
        Commands::Week => unreachable!(),
    }

    Ok(())
}
