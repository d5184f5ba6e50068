use thiserror::Error;

/// Per-column conversion failures. None of these abort a harmonization
/// run; the pipeline records them and keeps the original values.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum UnitError {
    /// The source unit was not recognized by the grammar.
    #[error("unrecognized unit '{raw}'")]
    UnknownUnit { raw: String },

    /// The requested target did not parse into a known unit.
    #[error("invalid target unit '{spec}'")]
    InvalidTarget { spec: String },

    #[error("cannot convert {from} to {to}")]
    Incompatible { from: String, to: String },

    #[error("no molar mass for '{substance}'")]
    UnresolvedMolarMass { substance: String },
}

pub type Result<T> = std::result::Result<T, UnitError>;

/// Reasons a substance identity is not a parseable chemical formula.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FormulaError {
    #[error("empty formula")]
    Empty,
    #[error("unknown element '{0}'")]
    UnknownElement(String),
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unbalanced brackets")]
    Unbalanced,
}
