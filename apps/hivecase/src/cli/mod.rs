//! # hivecase CLI Module
//!
//! This module implements the CLI interface for hivecase.
//!
//! ## Available Commands
//!
//! - `new` - Create a case from evidence exports
//! - `add` - Extend an existing case with more evidence
//! - `status` - Show what a case contains
//! - `verify` - Check that snapshot and store agree

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use hivecase_core::CaseError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// hivecase - incremental forensic registry case indexer
///
/// Builds a deduplicated, resumable index of registry hive exports.
/// Evidence can be added to a case over any number of runs.
#[derive(Parser, Debug)]
#[command(name = "hivecase")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the case directory
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub case: PathBuf,

    /// Configuration file (defaults to hivecase.toml in the case directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

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
    /// Create a new case from evidence exports
    New {
        /// Evidence export files (JSON)
        #[arg(required = true)]
        evidence: Vec<PathBuf>,
    },

    /// Add evidence exports to an existing case
    Add {
        /// Evidence export files (JSON)
        #[arg(required = true)]
        evidence: Vec<PathBuf>,
    },

    /// Show case status
    Status,

    /// Verify that the case snapshot and store agree
    Verify,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and resolved configuration.
pub fn execute(cli: Cli, config: &AppConfig) -> Result<(), CaseError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::New { evidence }) => cmd_new(&cli.case, config, json_mode, &evidence),
        Some(Commands::Add { evidence }) => cmd_add(&cli.case, config, json_mode, &evidence),
        Some(Commands::Status) => cmd_status(&cli.case, json_mode),
        Some(Commands::Verify) => cmd_verify(&cli.case, json_mode),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.case, json_mode)
        }
    }
}
