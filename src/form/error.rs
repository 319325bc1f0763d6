use std::path::PathBuf;

use thiserror::Error;

use crate::browser::error::DriverError;

/// Failures of extraction and filling.
///
/// Most variants are downgraded to a skipped field or a fallback path by
/// the caller; see [`FormError::is_fatal`] for the ones that abort.
#[derive(Debug, Error)]
pub enum FormError {
    /// Navigation kept failing; the caller proceeds with whatever loaded.
    #[error("navigation to {url} failed after {attempts} attempts: {reason}")]
    NavigationFailure {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// No candidate root met its threshold; the main document is used.
    #[error("no application form found on {url}")]
    FormNotFound { url: String },

    #[error("no label resolved for {element}")]
    LabelNotResolved { element: String },

    /// The field is still emitted, without options.
    #[error("option extraction failed for '{field}': {reason}")]
    OptionExtraction { field: String, reason: String },

    #[error("file for '{field}' not found on disk: {}", path.display())]
    FileNotOnDisk { field: String, path: PathBuf },

    #[error("value mismatch for '{field}': expected '{expected}', read back '{actual}'")]
    ValueMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("could not locate field '{field}' on the page")]
    FieldNotFound { field: String },

    #[error("field '{field}' has an unsupported type")]
    UnsupportedField { field: String },

    /// The fill input does not satisfy its contract.
    #[error("invalid fill input: {0}")]
    ContractViolation(String),

    #[error("browser session closed: {0}")]
    SessionClosed(String),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FormError {
    /// Session-level conditions that abort the whole operation.
    pub fn is_fatal(&self) -> bool {
        match self {
            FormError::ContractViolation(_) | FormError::SessionClosed(_) => true,
            FormError::Driver(e) => e.is_closed(),
            _ => false,
        }
    }
}
