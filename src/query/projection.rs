//! Field lists and result projection
//!
//! `select("name -password")` includes `name` and excludes `password`.
//! Inclusions become the storage column list; exclusions are applied to the
//! returned rows, since they cannot always be expressed as a column list.

use crate::storage::Row;

/// Space-separated string or list of field names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<String>);

impl Fields {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for Fields {
    fn from(fields: &str) -> Self {
        Fields(fields.split_whitespace().map(str::to_string).collect())
    }
}

impl From<String> for Fields {
    fn from(fields: String) -> Self {
        Fields::from(fields.as_str())
    }
}

impl From<Vec<String>> for Fields {
    fn from(fields: Vec<String>) -> Self {
        Fields(fields.into_iter().filter(|f| !f.trim().is_empty()).collect())
    }
}

impl From<Vec<&str>> for Fields {
    fn from(fields: Vec<&str>) -> Self {
        Fields::from(fields.into_iter().map(str::to_string).collect::<Vec<_>>())
    }
}

impl<const N: usize> From<[&str; N]> for Fields {
    fn from(fields: [&str; N]) -> Self {
        Fields::from(fields.to_vec())
    }
}

/// Splits `-field` into the field name and an exclusion flag.
pub(crate) fn split_sign(field: &str) -> (&str, bool) {
    match field.strip_prefix('-') {
        Some(name) => (name, true),
        None => (field, false),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl Projection {
    pub fn push(&mut self, field: &str) {
        let (name, excluded) = split_sign(field);
        if name.is_empty() {
            return;
        }
        let list = if excluded {
            &mut self.exclude
        } else {
            &mut self.include
        };
        if !list.iter().any(|f| f == name) {
            list.push(name.to_string());
        }
    }

    pub fn includes(&self) -> &[String] {
        &self.include
    }

    pub fn excludes(&self) -> &[String] {
        &self.exclude
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Columns to fetch. `required` columns are added when an inclusion list
    /// exists; `None` means every column.
    pub fn columns(&self, required: &[&str]) -> Option<Vec<String>> {
        if self.include.is_empty() {
            return None;
        }
        let mut columns = self.include.clone();
        for column in required {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
        Some(columns)
    }

    /// Drops columns that were not selected (except `keep`) and every
    /// excluded column.
    pub fn apply(&self, row: &mut Row, keep: &[&str]) {
        if self.is_empty() {
            return;
        }
        let projected: Row = std::mem::take(row)
            .into_iter()
            .filter(|(column, _)| {
                let selected = self.include.is_empty()
                    || self.include.iter().any(|c| c == column)
                    || keep.contains(&column.as_str());
                selected && !self.exclude.iter().any(|c| c == column)
            })
            .collect();
        *row = projected;
    }
}
