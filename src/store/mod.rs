//! Reads and writes against the workspace database, one module per store
//! path. Every write is a single statement against a single path.

pub mod admins;
pub mod assignments;
pub mod streams;
pub mod students;
pub mod trainers;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid status transition for assignment {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },

    #[error("{name} is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Malformed stored JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt stored row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "bad_params",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::Db(_) | Self::Json(_) | Self::Corrupt(_) => "db_query_failed",
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<String, StoreError> {
    let t = value.trim();
    if t.is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(t.to_string())
}

/// Batch labels have been written as a plain list, an index-keyed map of
/// labels, and a map of label -> true. Accept all three.
pub(crate) fn parse_labels(raw: &str) -> Result<Vec<String>, StoreError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let labels: Vec<String> = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(key, v)| match v {
                serde_json::Value::String(s) => s,
                _ => key,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(crate::roster::normalize_labels(labels))
}

/// Batch labels name `streams/{label}` paths, so `/` is never allowed.
pub(crate) fn check_label(label: &str) -> Result<(), StoreError> {
    if label.contains('/') {
        return Err(StoreError::Validation(format!(
            "batch {:?} must not contain '/'",
            label.trim()
        )));
    }
    Ok(())
}

/// Write-side counterpart of `parse_labels`.
pub(crate) fn clean_labels(raw: &[String]) -> Result<Vec<String>, StoreError> {
    for label in raw {
        check_label(label)?;
    }
    Ok(crate::roster::normalize_labels(raw))
}

pub(crate) fn labels_json(labels: &[String]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(labels)?)
}

#[cfg(test)]
pub(crate) fn test_conn() -> rusqlite::Connection {
    let conn = rusqlite::Connection::open_in_memory().expect("in-memory db");
    crate::db::init_schema(&conn).expect("schema");
    conn
}
