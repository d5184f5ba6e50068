//! Shared data model for name and unit harmonization of chemical
//! measurement tables.

pub mod cell;
pub mod error;
#[cfg(feature = "polars")]
pub mod frame;
pub mod matching;
pub mod report;
pub mod resolve;
pub mod table;
pub mod unit;

pub use cell::{Cell, DecimalStyle, RawValue};
pub use error::{ModelError, Result};
pub use matching::{MatchMethod, MatchResult, MatchStrategy};
pub use report::{
    ColumnFate, ColumnReport, ConversionOutcome, HarmonizationReport, MergeRecord, Stage,
};
pub use resolve::IdentifierResolver;
pub use table::{Column, ColumnRole, Table};
pub use unit::{ParsedUnit, QuantityKind, ScalePrefix, VolumeUnit};
