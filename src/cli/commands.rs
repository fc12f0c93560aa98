//! CLI command implementations
//!
//! Both commands run without a database connection: `check` scans model
//! definitions into an in-memory registry, `compile` only runs the filter
//! compiler.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::{Database, DatabaseOptions};
use crate::filter::{compile as compile_tree, WhereClause};
use crate::observability::MemorySink;
use crate::query::DEFAULT_LIMIT;
use crate::storage::MemoryStore;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory of model definition files (required)
    pub models_dir: String,

    /// Report generated SQL (optional, default false)
    #[serde(default)]
    pub debug: bool,

    /// Default page size (optional, default 10)
    #[serde(default = "default_limit")]
    pub default_limit: u64,
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.models_dir.trim().is_empty() {
            return Err(CliError::config_error("models_dir is required"));
        }
        if self.default_limit == 0 {
            return Err(CliError::config_error("default_limit must be > 0"));
        }
        Ok(())
    }

    pub fn models_path(&self) -> PathBuf {
        PathBuf::from(&self.models_dir)
    }

    pub fn database_options(&self) -> DatabaseOptions {
        DatabaseOptions {
            debug: self.debug,
            default_limit: self.default_limit,
        }
    }
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Check { config } => check(&config),
        Command::Compile => compile(),
    }
}

/// Scan the configured models directory and print models plus diagnostics
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let report = check_models(&config)?;
    write_response(report)
}

/// Compile the filter read from stdin and print tree, SQL and bindings
pub fn compile() -> CliResult<()> {
    let filter = read_request()?;
    let compiled = compile_filter(&filter)?;
    write_response(compiled)
}

pub(crate) fn check_models(config: &Config) -> CliResult<Value> {
    let sink = Arc::new(MemorySink::new());
    let mut db = Database::connect_with_sink(
        Arc::new(MemoryStore::new()),
        config.database_options(),
        sink.clone(),
    );

    let report = db
        .scan(config.models_path())
        .map_err(|e| CliError::scan_failed(e.to_string()))?;

    let models = db
        .registry()
        .models()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({
        "models": models,
        "registered": report.registered.len(),
        "skipped": report.skipped.len(),
        "unresolved": report.relations.unresolved.len(),
        "diagnostics": sink.problems(),
    }))
}

pub(crate) fn compile_filter(filter: &Value) -> CliResult<Value> {
    let object = filter
        .as_object()
        .ok_or_else(|| CliError::compile_failed("Filter must be a JSON object"))?;

    let tree = compile_tree(object)
        .map_err(|e| CliError::compile_failed(format!("{}: {}", e.code(), e)))?;
    let (sql, bindings) = WhereClause::from_predicate(tree.as_ref()).to_sql();

    Ok(json!({
        "tree": tree,
        "where": sql,
        "bindings": bindings,
    }))
}
