//! # MBKM Dashboard Server
//!
//! The main binary of the MBKM registration and logbook dashboard.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for review and reporting
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              apps/mbkm (THE BINARY)           │
//! │                                               │
//! │   ┌─────────────┐          ┌─────────────┐    │
//! │   │    CLI      │          │  HTTP API   │    │
//! │   │   (clap)    │          │   (axum)    │    │
//! │   └──────┬──────┘          └──────┬──────┘    │
//! │          └────────────┬───────────┘           │
//! │                       ▼                       │
//! │               ┌───────────────┐               │
//! │               │   mbkm-core   │               │
//! │               │  (THE LOGIC)  │               │
//! │               └───────────────┘               │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! mbkm server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! mbkm import -i seed.json
//! mbkm list --status active
//! mbkm export -t logbooks -o logbooks.csv
//! ```

use clap::Parser;
use mbkm::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // MBKM_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("MBKM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mbkm=info,mbkm_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  ███╗   ███╗██████╗ ██╗  ██╗███╗   ███╗
  ████╗ ████║██╔══██╗██║ ██╔╝████╗ ████║
  ██╔████╔██║██████╔╝█████╔╝ ██╔████╔██║
  ██║╚██╔╝██║██╔══██╗██╔═██╗ ██║╚██╔╝██║
  ██║ ╚═╝ ██║██████╔╝██║  ██╗██║ ╚═╝ ██║
  ╚═╝     ╚═╝╚═════╝ ╚═╝  ╚═╝╚═╝     ╚═╝

  MBKM Dashboard v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
