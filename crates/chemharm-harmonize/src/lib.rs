//! Harmonization of chemical measurement tables.
//!
//! [`HarmonizationPipeline`] renames feature columns through a
//! [`chemharm_map::MappingDictionary`], merges duplicate columns, parses
//! unit strings and converts values into target units. Everything that
//! could not be reconciled is recorded in the returned
//! [`chemharm_model::HarmonizationReport`] rather than failing the run.

pub mod config;
pub mod error;
pub mod merge;
pub mod numeric;
pub mod pipeline;

pub use config::HarmonizeConfig;
pub use error::{HarmonizeError, Result};
pub use numeric::{
    DetectionLimitPolicy, NumberFormat, ParsedNumber, normalize_cell, parse_measurement,
};
pub use pipeline::{HarmonizationPipeline, Harmonized};
