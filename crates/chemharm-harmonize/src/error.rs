//! Errors that stop a harmonization run.
//!
//! Only configuration problems end up here. Per-column degradations such as
//! unresolved molar masses are recorded in the report instead.

use std::path::PathBuf;

use chemharm_map::MapError;
use chemharm_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HarmonizeError {
    /// A column is listed in two merge groups, or twice in one group.
    #[error("column '{column}' appears in more than one merge group")]
    AmbiguousMergeGroup { column: String },

    #[error("merge group {group:?} needs at least two columns")]
    MergeGroupTooSmall { group: Vec<String> },

    /// Merge, drop or override configuration names a column the table lacks.
    #[error("{context} references unknown column '{column}'")]
    UnknownColumn {
        context: &'static str,
        column: String,
    },

    #[error("target unit '{spec}' is not a recognized unit")]
    InvalidTargetUnit { spec: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Map(#[from] MapError),
}

pub type Result<T> = std::result::Result<T, HarmonizeError>;

impl HarmonizeError {
    pub fn unknown_column(context: &'static str, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            context,
            column: column.into(),
        }
    }

    /// Check if this error is recoverable (user can fix the input and retry).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousMergeGroup { .. }
                | Self::MergeGroupTooSmall { .. }
                | Self::UnknownColumn { .. }
                | Self::InvalidTargetUnit { .. }
                | Self::Config { .. }
                | Self::Toml(_)
        )
    }

    /// Hint shown next to the error message.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::AmbiguousMergeGroup { .. } => {
                Some("List every column in at most one merge_columns group.")
            }
            Self::MergeGroupTooSmall { .. } => {
                Some("A merge group needs a surviving column and at least one donor.")
            }
            Self::UnknownColumn { .. } => {
                Some("Use the column headers exactly as they appear in the input table.")
            }
            Self::InvalidTargetUnit { .. } => {
                Some("Use a concentration such as 'mg/l', 'umol/l' or 'mg N/l'.")
            }
            Self::Toml(_) => Some("Check the configuration file against the documented keys."),
            Self::Io { .. } => Some("Check that the file exists and is readable."),
            _ => None,
        }
    }
}
