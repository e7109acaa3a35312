//! # hivecase - Forensic Registry Case Indexer
//!
//! The command line front end for `hivecase-core`.
//!
//! ## Usage
//!
//! ```bash
//! # Create a case from hive exports
//! hivecase --case ./case new SYSTEM.json SOFTWARE.json
//!
//! # Extend it later
//! hivecase --case ./case add NTUSER.json
//!
//! # Inspect and check it
//! hivecase --case ./case status
//! hivecase --case ./case verify
//! ```

use clap::Parser;
use hivecase::cli;
use hivecase::config::{AppConfig, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Configuration may pick the log format, so resolve it before logging.
    let config = AppConfig::resolve(cli.config.as_deref(), &cli.case);

    // HIVECASE_LOG_FORMAT=json overrides the configured format.
    let log_format = match std::env::var("HIVECASE_LOG_FORMAT") {
        Ok(value) => LogFormat::from_env_value(&value),
        Err(_) => config
            .as_ref()
            .map(|c| c.log.format)
            .unwrap_or_default(),
    };
    init_tracing(log_format, cli.verbose);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let default_filter = if verbose {
        "hivecase=debug"
    } else {
        "hivecase=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so --json-mode output on stdout stays parseable.
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Print the hivecase startup banner.
fn print_banner() {
    println!(
        r#"
  hivecase v{}
  incremental registry case indexer
"#,
        env!("CARGO_PKG_VERSION")
    );
}
