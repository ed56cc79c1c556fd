// 🚨 Build Errors - Fatal conditions only
// Per-row problems never land here; they are RejectReasons counted by diagnostics.

use thiserror::Error;

/// Conditions that abort a dataset build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A required canonical field has no matching column in the extract header.
    #[error("source '{source_name}' is missing required field '{field}' (available: {})", available.join(", "))]
    MissingRequiredField {
        source_name: String,
        field: String,
        available: Vec<String>,
    },

    /// Nothing survived filtering; refuse to emit a document.
    #[error("dataset '{dataset}' produced no entities; refusing to write")]
    EmptyOutput { dataset: String },

    #[error("invalid data cycle '{cycle}': expected YYYY-MM-DD")]
    InvalidCycle { cycle: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// TESTS
// ============================================================================
