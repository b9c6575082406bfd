//! # Stock Intake CLI (`intake`)
//!
//! The `intake` binary is the primary interface for the intake pipeline.
//! It provides commands for database initialization, document submission,
//! processing, status polling, and the catalog/ledger read models.
//!
//! ## Usage
//!
//! ```bash
//! intake --config ./config/intake.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `intake init` | Create the SQLite database and run schema migrations |
//! | `intake submit <paths>` | Register documents (files or directories) as PENDING |
//! | `intake process <id>` | Run the pipeline for one document |
//! | `intake process --pending` | Process every PENDING document |
//! | `intake status <id>` | Poll a document's lifecycle state and summary |
//! | `intake vendors` | List registered extraction strategies |
//! | `intake products` | Catalog listing with stock and derived status |
//! | `intake movements <identifier>` | Ledger trail for one product |
//! | `intake adjust <identifier>` | Manual stock correction with audit record |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! intake init --config ./config/intake.toml
//!
//! # Register an Amazon PO spreadsheet
//! intake submit "PO automation/amazon-po.xlsx" --vendor amazon
//!
//! # Register a whole drop folder of Blinkit PDFs
//! intake submit ./inbox/blinkit --vendor blinkit
//!
//! # Process everything pending
//! intake process --pending
//!
//! # Watch one document
//! intake status 3f2a91d0-...
//!
//! # Low-stock report
//! intake products --status LOW_STOCK
//! ```

mod aggregate;
mod catalog;
mod config;
mod db;
mod extractor;
mod migrate;
mod models;
mod normalize;
mod process;
mod progress;
mod reconcile;
mod router;
mod status;
#[allow(dead_code)]
mod strategy;
mod submit;
mod vendor_delegated;
mod vendor_tabular;
mod vendors;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stock Intake CLI — vendor procurement document ingestion and stock
/// reconciliation.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file with database, intake, processing, and extractor settings.
#[derive(Parser)]
#[command(
    name = "intake",
    about = "Stock Intake — vendor procurement document ingestion and stock reconciliation",
    version,
    long_about = "Stock Intake ingests vendor-supplied procurement documents (spreadsheets, \
    PDFs, word-processor files), extracts structured line items via per-vendor strategies \
    (deterministic column mapping or a delegated extraction capability), aggregates duplicate \
    rows, and reconciles the result against a product catalog and an append-only stock ledger."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/intake.toml`. Database, intake, processing,
    /// and extractor settings are read from this file.
    #[arg(long, global = true, default_value = "./config/intake.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, catalog_entries, stock_levels, stock_movements).
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Register documents for processing.
    ///
    /// Files are registered directly; directories are walked and filtered
    /// through the configured include globs. Each document is stored as
    /// PENDING with its vendor tag and declared or inferred content kind.
    Submit {
        /// Files or directories to register.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Vendor tag selecting the extraction strategy. Unknown tags fall
        /// back to generic handling at processing time.
        #[arg(long)]
        vendor: Option<String>,

        /// Declared content kind (`spreadsheet`, `pdf`, `word`, `text`).
        /// Inferred from the file extension when omitted.
        #[arg(long)]
        kind: Option<String>,
    },

    /// Process one document, or everything pending.
    ///
    /// Runs extraction, aggregation, and reconciliation, then persists
    /// the terminal state. A run with per-item errors still completes;
    /// only pipeline-level failures mark the document FAILED.
    Process {
        /// Document id to process.
        #[arg(required_unless_present = "pending")]
        id: Option<String>,

        /// Process every PENDING document in submission order, continuing
        /// past documents that fail.
        #[arg(long, conflicts_with = "id")]
        pending: bool,

        /// Reset a COMPLETED/FAILED document and start a fresh run.
        #[arg(long, conflicts_with = "pending")]
        again: bool,

        /// Only update existing catalog entries; report unknown
        /// identifiers as unmatched.
        #[arg(long)]
        match_existing_only: bool,

        /// Replace on-hand stock with incoming quantities instead of
        /// adding to it.
        #[arg(long)]
        replace_stock: bool,

        /// Progress reporting on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Show a document's lifecycle state and persisted outputs.
    ///
    /// PENDING and PROCESSING documents will still change; COMPLETED and
    /// FAILED are terminal for the run.
    Status {
        /// Document id.
        id: String,
    },

    /// List registered extraction strategies and the input each handles.
    Vendors,

    /// List catalog entries with on-hand stock and derived status.
    Products {
        /// Substring filter on identifier, name, brand, or category.
        #[arg(long)]
        query: Option<String>,

        /// Filter by derived status: IN_STOCK, LOW_STOCK, or OUT_OF_STOCK.
        #[arg(long)]
        status: Option<String>,
    },

    /// Show the movement ledger for one product.
    Movements {
        /// Catalog identifier (SKU/EAN/ASIN-like code).
        identifier: String,
    },

    /// Manually adjust one product's stock, with an audit record.
    ///
    /// The resulting quantity is clamped at zero. Exactly one of `--set`
    /// or `--delta` is required.
    Adjust {
        /// Catalog identifier.
        identifier: String,

        /// Set the on-hand quantity to this value.
        #[arg(long)]
        set: Option<i64>,

        /// Add this (possibly negative) delta to the on-hand quantity.
        #[arg(long, allow_hyphen_values = true)]
        delta: Option<i64>,

        /// Reason recorded on the movement (defaults to ADJUSTMENT).
        #[arg(long)]
        reason: Option<String>,

        /// Free-form note recorded on the movement.
        #[arg(long)]
        notes: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Vendors listing needs no config or database.
    if matches!(cli.command, Commands::Vendors) {
        return vendors::list_vendors();
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Submit {
            paths,
            vendor,
            kind,
        } => {
            submit::run_submit(&cfg, &paths, vendor, kind).await?;
        }
        Commands::Process {
            id,
            pending,
            again,
            match_existing_only,
            replace_stock,
            progress,
        } => {
            if pending {
                let mode = progress::ProgressMode::from_flag(progress.as_deref())?;
                process::run_process_pending(&cfg, match_existing_only, replace_stock, mode)
                    .await?;
            } else {
                // required_unless_present guarantees the id is set here.
                let id = id.expect("clap enforces id");
                process::run_process(&cfg, &id, again, match_existing_only, replace_stock).await?;
            }
        }
        Commands::Status { id } => {
            status::run_status(&cfg, &id).await?;
        }
        Commands::Vendors => unreachable!(),
        Commands::Products { query, status } => {
            catalog::run_products(&cfg, query, status).await?;
        }
        Commands::Movements { identifier } => {
            catalog::run_movements(&cfg, &identifier).await?;
        }
        Commands::Adjust {
            identifier,
            set,
            delta,
            reason,
            notes,
        } => {
            catalog::run_adjust(&cfg, &identifier, set, delta, reason, notes).await?;
        }
    }

    Ok(())
}
