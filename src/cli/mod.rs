//! CLI module for centaure
//!
//! Provides command-line interface for:
//! - check: scan model definitions and report diagnostics
//! - compile: turn a filter object into a predicate tree and SQL

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, compile, run, run_command, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
