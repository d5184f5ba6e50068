//! Matching of raw feature names to canonical aliases.
//!
//! A [`MappingDictionary`] holds the curated keys; [`match_name`] (or a
//! [`MatchEngine`] bound to a dictionary) applies an ordered list of
//! strategies with first-match-wins semantics.

pub mod dictionary;
pub mod engine;
pub mod error;
pub mod feature_table;
pub mod normalize;
pub mod score;

pub use dictionary::{DictionaryEntry, MappingDictionary};
pub use engine::{MatchEngine, MatchOptions, match_name};
pub use error::{MapError, Result};
pub use feature_table::{FeatureRecord, FeatureTable};
pub use normalize::{TextRules, normalize_key, split_name_and_unit, strip_parenthesized, tidy};
pub use score::{FuzzyScorer, FuzzyThreshold, token_set_ratio, token_sort_ratio};
