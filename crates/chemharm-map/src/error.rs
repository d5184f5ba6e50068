use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or persisting a mapping dictionary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MapError {
    /// A search key appears twice (after case normalization).
    #[error("duplicate search key '{0}'")]
    DuplicateKey(String),

    #[error("search key must not be empty")]
    EmptyKey,

    #[error("invalid pattern '{pattern}' for key '{key}': {source}")]
    InvalidPattern {
        key: String,
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    /// The requested vocabulary is not a column of the feature table.
    #[error("unknown vocabulary '{vocabulary}' (available: {available})")]
    UnknownVocabulary {
        vocabulary: String,
        available: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid dictionary JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;
