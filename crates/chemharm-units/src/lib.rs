//! Unit strings, molar masses and concentration arithmetic.
//!
//! [`UnitParser`] turns free text such as `mg N/l NO3` into a
//! [`ParsedUnit`](chemharm_model::ParsedUnit), [`MolarMassResolver`]
//! supplies g/mol values and [`UnitConverter`] computes conversion factors
//! between parsed units.

pub mod converter;
pub mod elements;
pub mod error;
pub mod formula;
pub mod grammar;
pub mod molar_mass;
pub mod parser;

pub use converter::{TargetPlan, TargetUnits, UnitConverter};
pub use error::{FormulaError, Result, UnitError};
pub use molar_mass::{LookupError, MassSource, MolarMassLookup, MolarMassResolver, MolarMassTable};
pub use parser::{DEFAULT_REPLACEMENTS, UnitParser};
