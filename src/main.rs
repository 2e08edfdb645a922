//! # Docket CLI (`dkt`)
//!
//! The `dkt` binary is the primary interface for Docket. It provides
//! commands for batch-renaming PDFs, browsing the processing ledger,
//! managing learned naming patterns, and inspecting individual documents.
//!
//! ## Usage
//!
//! ```bash
//! dkt --config ./docket.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dkt process <dir>` | Extract, name, and rename every PDF in a directory |
//! | `dkt split <file>` | Detect and split multi-document scans |
//! | `dkt history` | Show past naming decisions from the ledger |
//! | `dkt learn --stats` | Show learned pattern statistics |
//! | `dkt learn --scan-corrections` | Detect and record manual renames |
//! | `dkt info <file>` | Inspect a PDF's pages and metadata |
//!
//! ## Examples
//!
//! ```bash
//! # Preview what a batch run would do
//! dkt process ~/scans --dry-run
//!
//! # Rename for real, thorough extraction
//! dkt process ~/scans --speed thorough
//!
//! # Pull apart a stack scanned as one file
//! dkt split ~/scans/stack.pdf
//!
//! # See the last ten decisions
//! dkt history --limit 10
//!
//! # Fold manual renames back into the pattern store
//! dkt learn --scan-corrections --yes
//! ```

mod config;
mod extract;
mod history;
mod info;
mod learn_cmd;
mod ledger;
mod namer;
mod ocr;
mod pattern_store;
mod pipeline;
mod split;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SpeedProfile;

/// Docket CLI: a local-first PDF naming pipeline with learned patterns.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docket.example.toml` for a full example; every setting
/// has a sensible default, so the flag is optional.
#[derive(Parser)]
#[command(
    name = "dkt",
    about = "Docket: name scanned PDFs from their content, and learn from every decision",
    version,
    long_about = "Docket extracts text from PDFs (native text first, OCR for scans), asks a \
    local model for a date and description, renames the file, and records every decision in an \
    append-only ledger. High-confidence decisions become reusable keyword patterns, so recurring \
    documents are named instantly without calling the model again."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./docket.toml`. Missing file means built-in defaults.
    #[arg(long, global = true, default_value = "./docket.toml")]
    config: PathBuf,

    /// Enable debug-level diagnostics on stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Process a directory (or single file) of PDFs.
    ///
    /// For each document: extract text, compute its content identity, then
    /// name it from (in priority order) a recorded user correction, a
    /// learned pattern, or the configured model. Renames happen in place;
    /// every decision is appended to the ledger.
    Process {
        /// Directory or single PDF to process.
        input: PathBuf,

        /// Descend into subdirectories.
        #[arg(long, short)]
        recursive: bool,

        /// Show what would be renamed without touching any file.
        #[arg(long)]
        dry_run: bool,

        /// Reprocess documents the ledger already marks as done.
        #[arg(long)]
        force: bool,

        /// Extraction profile: fast (1 page), balanced (3 pages), thorough (all).
        #[arg(long, value_enum, default_value_t = SpeedProfile::Balanced)]
        speed: SpeedProfile,

        /// Maximum number of documents to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Skip the pattern store: neither match learned patterns nor
        /// learn new ones this run.
        #[arg(long)]
        no_patterns: bool,

        /// Override the configured namer model for this run.
        #[arg(long)]
        model: Option<String>,
    },

    /// Detect and split a multi-document scan.
    ///
    /// Several papers scanned as one PDF are pulled apart: the model reads
    /// every page, proposes contiguous document segments, and each confirmed
    /// segment is written out as its own PDF. The original file is kept.
    Split {
        /// Path to the PDF.
        file: PathBuf,

        /// Write the split files without prompting.
        #[arg(long)]
        yes: bool,

        /// Override the configured namer model for this run.
        #[arg(long)]
        model: Option<String>,
    },

    /// Show past naming decisions.
    History {
        /// Maximum number of entries to show, newest first.
        #[arg(long)]
        limit: Option<usize>,

        /// Show aggregate counts instead of individual entries.
        #[arg(long)]
        summary: bool,
    },

    /// Pattern statistics and manual-correction scanning.
    Learn {
        /// Show learned pattern statistics.
        #[arg(long)]
        stats: bool,

        /// Detect manual renames and record them as corrections.
        #[arg(long)]
        scan_corrections: bool,

        /// Record detected corrections without prompting.
        #[arg(long)]
        yes: bool,
    },

    /// Inspect a PDF without renaming it.
    ///
    /// Prints page count, file size, embedded metadata, and the latest
    /// ledger entry for the file, if any.
    Info {
        /// Path to the PDF.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Process {
            input,
            recursive,
            dry_run,
            force,
            speed,
            limit,
            no_patterns,
            model,
        } => {
            let report = pipeline::run_process(
                &cfg,
                &pipeline::ProcessOptions {
                    input,
                    recursive,
                    dry_run,
                    force,
                    speed,
                    limit,
                    no_patterns,
                    model,
                },
            )
            .await?;
            if report.failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Split { file, yes, model } => {
            split::run_split(&cfg, &file, model, yes).await?;
        }
        Commands::History { limit, summary } => {
            history::run_history(&cfg, limit, summary)?;
        }
        Commands::Learn {
            stats,
            scan_corrections,
            yes,
        } => {
            if scan_corrections {
                learn_cmd::run_scan_corrections(&cfg, yes).await?;
            } else if stats {
                learn_cmd::run_stats(&cfg)?;
            } else {
                anyhow::bail!("learn requires --stats or --scan-corrections");
            }
        }
        Commands::Info { file } => {
            info::run_info(&cfg, &file)?;
        }
    }

    Ok(())
}
