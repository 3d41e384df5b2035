//! # MBKM CLI Module
//!
//! This module implements the CLI interface for the MBKM dashboard.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show database status and headline counts
//! - `stats` - Show registrant or logbook statistics
//! - `list` - List registrants with filters
//! - `show` - Show one registrant with its logbook
//! - `search` - Quick search by NIM, name or placement
//! - `approve` / `reject` - Assess a registration
//! - `verify-payment` / `reject-payment` - Review a payment proof
//! - `export` - Write a registrant or logbook CSV
//! - `import` - Load a JSON seed file
//! - `init` - Initialize a new database

mod commands;

use crate::config::{BackendKind, Config, DEFAULT_CONFIG_FILE};
use clap::{Parser, Subcommand};
use mbkm_core::MbkmError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// MBKM Dashboard
///
/// Registration lifecycle and logbook completion tracking for MBKM
/// activities.
#[derive(Parser, Debug)]
#[command(name = "mbkm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Path to the database (overrides the configuration file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the configuration file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the configuration file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show database status and headline counts
    Status,

    /// Show statistics
    Stats {
        /// Show logbook statistics instead of registrant statistics
        #[arg(short, long)]
        logbooks: bool,
    },

    /// List registrants
    List {
        /// Lifecycle status (awaiting_payment, active, awaiting_assessment, completed)
        #[arg(short, long)]
        status: Option<String>,

        /// Activity type code
        #[arg(short = 't', long)]
        activity_type: Option<String>,

        /// Academic year, e.g. 2024/2025
        #[arg(short = 'y', long)]
        academic_year: Option<String>,

        /// Semester (Ganjil, Genap)
        #[arg(long)]
        semester: Option<String>,

        /// Study program id
        #[arg(long)]
        prodi: Option<String>,

        /// Search over NIM, name and placement
        #[arg(long)]
        search: Option<String>,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: usize,

        /// Rows per page
        #[arg(long)]
        per_page: Option<usize>,
    },

    /// Show one registrant with its logbook
    Show {
        /// Registration id
        id: u64,
    },

    /// Quick search by NIM, name or placement
    Search {
        /// Search term
        term: String,
    },

    /// Approve a registration
    Approve {
        /// Registration id
        id: u64,

        /// Grade to record (default: A)
        #[arg(short, long)]
        grade: Option<String>,
    },

    /// Record a rejection on a registration
    Reject {
        /// Registration id
        id: u64,

        /// Rejection reason
        #[arg(short, long)]
        reason: String,
    },

    /// Mark a payment proof as verified
    VerifyPayment {
        /// Registration id
        id: u64,
    },

    /// Reject a payment proof
    RejectPayment {
        /// Registration id
        id: u64,

        /// Rejection reason
        #[arg(short, long)]
        reason: String,
    },

    /// Export a CSV file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// What to export (registrants, logbooks)
        #[arg(short = 't', long, default_value = "registrants")]
        kind: String,

        /// Academic year filter
        #[arg(short = 'y', long)]
        academic_year: Option<String>,

        /// Study program id filter
        #[arg(long)]
        prodi: Option<String>,

        /// Placement filter (registrants only)
        #[arg(long)]
        placement: Option<String>,

        /// Semester filter, Ganjil or Genap (registrants only)
        #[arg(long)]
        semester: Option<String>,

        /// Search over NIM, name and placement
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Import students, registrations and logbooks from a JSON seed file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Load the configuration file and apply the command-line overrides.
pub fn resolve_config(cli: &Cli) -> Result<Config, MbkmError> {
    let mut config = Config::load(&cli.config)?;
    if let Some(database) = &cli.database {
        config.storage.database = database.clone();
    }
    if let Some(backend) = &cli.backend {
        config.storage.backend = backend.parse::<BackendKind>()?;
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), MbkmError> {
    let config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&config, host, port).await,
        Some(Commands::Status) => cmd_status(&config, json_mode),
        Some(Commands::Stats { logbooks }) => cmd_stats(&config, json_mode, logbooks),
        Some(Commands::List {
            status,
            activity_type,
            academic_year,
            semester,
            prodi,
            search,
            page,
            per_page,
        }) => {
            let params = crate::api::RegistrantParams {
                search,
                status,
                activity_type,
                academic_year,
                semester,
                prodi,
                page: Some(page),
                per_page,
            };
            cmd_list(&config, json_mode, &params)
        }
        Some(Commands::Show { id }) => cmd_show(&config, json_mode, cli.verbose, id),
        Some(Commands::Search { term }) => cmd_search(&config, json_mode, &term),
        Some(Commands::Approve { id, grade }) => {
            cmd_approve(&config, json_mode, id, grade.as_deref())
        }
        Some(Commands::Reject { id, reason }) => cmd_reject(&config, json_mode, id, &reason),
        Some(Commands::VerifyPayment { id }) => cmd_verify_payment(&config, json_mode, id),
        Some(Commands::RejectPayment { id, reason }) => {
            cmd_reject_payment(&config, json_mode, id, &reason)
        }
        Some(Commands::Export {
            output,
            kind,
            academic_year,
            prodi,
            placement,
            semester,
            search,
        }) => cmd_export(
            &config,
            &output,
            &kind,
            ExportFilters {
                academic_year,
                prodi,
                placement,
                semester,
                search,
            },
        ),
        Some(Commands::Import { input }) => cmd_import(&config, json_mode, &input),
        Some(Commands::Init { force }) => cmd_init(&config, force),
        None => {
            // No subcommand - show status by default
            cmd_status(&config, json_mode)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
