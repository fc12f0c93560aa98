//! Model definition loader
//!
//! Reads `*.json` model definitions from a directory into a registry:
//! - files are read in file-name order
//! - a malformed file is reported and skipped
//! - an unreadable directory is an error
//! - relations are resolved once every file is registered

use std::fs;
use std::path::{Path, PathBuf};

use crate::observability::Event;

use super::errors::{SchemaError, SchemaResult};
use super::registry::SchemaRegistry;
use super::relations::ResolveReport;
use super::types::ModelDefinition;

/// Summary of one directory scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Names of models registered by this scan
    pub registered: Vec<String>,
    /// Files or definitions that were skipped
    pub skipped: Vec<SchemaError>,
    /// Relation pass run after registration
    pub relations: ResolveReport,
}

/// Loads model definition files from one directory.
pub struct SchemaLoader {
    models_dir: PathBuf,
}

impl SchemaLoader {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Registers every definition file and resolves relations.
    pub fn scan(&self, registry: &mut SchemaRegistry) -> SchemaResult<ScanReport> {
        let mut report = ScanReport::default();

        for path in self.definition_files()? {
            let definition = match read_definition(&path) {
                Ok(definition) => definition,
                Err(err) => {
                    registry.report(&err);
                    report.skipped.push(err);
                    continue;
                }
            };

            // register() already reported the failure
            match registry.add_model(definition) {
                Ok(schema) => report.registered.push(schema.name.clone()),
                Err(err) => report.skipped.push(err),
            }
        }

        report.relations = registry.resolve_all();

        registry.sink().event(
            Event::SchemaScanned,
            &[
                ("dir", &self.models_dir.display().to_string()),
                ("registered", &report.registered.len().to_string()),
                ("skipped", &report.skipped.len().to_string()),
            ],
        );

        Ok(report)
    }

    /// Writes a definition as `<name>.json`. Refuses to overwrite.
    pub fn save_definition(&self, definition: &ModelDefinition) -> SchemaResult<PathBuf> {
        let name = definition
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(SchemaError::MissingModelName)?;

        let path = self.models_dir.join(format!("{}.json", name));
        if path.exists() {
            return Err(SchemaError::DuplicateModel(name.to_string()));
        }

        fs::create_dir_all(&self.models_dir).map_err(|e| {
            malformed(&self.models_dir, format!("Failed to create directory: {}", e))
        })?;

        let content = serde_json::to_string_pretty(definition)
            .map_err(|e| malformed(&path, format!("Failed to serialize definition: {}", e)))?;

        fs::write(&path, content)
            .map_err(|e| malformed(&path, format!("Failed to write file: {}", e)))?;

        Ok(path)
    }

    fn definition_files(&self) -> SchemaResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.models_dir).map_err(|e| {
            malformed(&self.models_dir, format!("Failed to read directory: {}", e))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| {
                    malformed(&self.models_dir, format!("Failed to read directory entry: {}", e))
                })?
                .path();

            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn read_definition(path: &Path) -> SchemaResult<ModelDefinition> {
    let content = fs::read_to_string(path)
        .map_err(|e| malformed(path, format!("Failed to read file: {}", e)))?;

    serde_json::from_str(&content).map_err(|e| malformed(path, format!("Invalid JSON: {}", e)))
}

fn malformed(path: &Path, reason: String) -> SchemaError {
    SchemaError::MalformedDefinition {
        path: path.display().to_string(),
        reason,
    }
}
