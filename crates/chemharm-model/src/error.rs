use thiserror::Error;

/// Errors raised while constructing model values.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A column's length differs from the table's row count.
    #[error("column '{column}' has {found} values, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    /// Two columns share one name.
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
