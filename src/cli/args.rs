//! CLI argument definitions using clap
//!
//! Commands:
//! - centaure check --config <path>
//! - centaure compile

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Centaure - schema registry and filter compiler for relational models
#[derive(Parser, Debug)]
#[command(name = "centaure")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan the models directory and resolve relations
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./centaure.json")]
        config: PathBuf,
    },

    /// Compile a filter object read from stdin
    Compile,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
