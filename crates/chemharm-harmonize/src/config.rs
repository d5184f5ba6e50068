//! Run configuration, loadable from TOML.
//!
//! ```toml
//! match_method = ["exact", "fuzzy"]
//! remove_strings = ["icpms"]
//! replace_strings = [["µ", "u"]]
//! merge_columns = [["Chloride", "Chloride (2)"]]
//! target_units = "mmol/l"
//!
//! [override_units]
//! Zn = "ug/l"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chemharm_map::{FuzzyScorer, FuzzyThreshold, MatchOptions, TextRules};
use chemharm_model::MatchStrategy;
use chemharm_units::{TargetUnits, UnitParser};
use serde::{Deserialize, Serialize};

use crate::error::{HarmonizeError, Result};
use crate::numeric::{DetectionLimitPolicy, NumberFormat};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarmonizeConfig {
    /// Strategies tried in order; the first match wins.
    pub match_method: Vec<MatchStrategy>,
    pub remove_strings: Vec<String>,
    /// Ordered `[from, to]` pairs.
    pub replace_strings: Vec<(String, String)>,
    pub strip_parentheses: bool,
    pub fuzzy_threshold: f64,
    pub fuzzy_scorer: FuzzyScorer,
    /// Use the length-dependent threshold instead of `fuzzy_threshold`.
    pub fuzzy_length_scaled: bool,
    /// Replaces the unit parser's built-in substitutions when set.
    pub unit_replace_strings: Option<Vec<(String, String)>>,
    /// Groups of source column names; the first of each group survives.
    pub merge_columns: Vec<Vec<String>>,
    pub drop_columns: Vec<String>,
    /// No conversion happens when unset, apart from `override_units`.
    pub target_units: Option<TargetUnits>,
    /// Target unit per substance alias or source column name.
    pub override_units: BTreeMap<String, String>,
    pub default_target_unit: String,
    pub lt_symbol: String,
    pub decimal_separator: char,
    pub detection_limit: DetectionLimitPolicy,
    /// Split units out of headers such as `Na (mg/l)` for columns without one.
    pub infer_units_from_names: bool,
}

impl Default for HarmonizeConfig {
    fn default() -> Self {
        Self {
            match_method: vec![MatchStrategy::Exact],
            remove_strings: Vec::new(),
            replace_strings: Vec::new(),
            strip_parentheses: false,
            fuzzy_threshold: 100.0,
            fuzzy_scorer: FuzzyScorer::default(),
            fuzzy_length_scaled: false,
            unit_replace_strings: None,
            merge_columns: Vec::new(),
            drop_columns: Vec::new(),
            target_units: None,
            override_units: BTreeMap::new(),
            default_target_unit: "mg/l".to_string(),
            lt_symbol: "<".to_string(),
            decimal_separator: ',',
            detection_limit: DetectionLimitPolicy::Keep,
            infer_units_from_names: false,
        }
    }
}

impl HarmonizeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| HarmonizeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn check(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err(HarmonizeError::Config {
                message: format!(
                    "fuzzy_threshold must be between 0 and 100, got {}",
                    self.fuzzy_threshold
                ),
            });
        }
        if self.decimal_separator != ',' && self.decimal_separator != '.' {
            return Err(HarmonizeError::Config {
                message: format!(
                    "decimal_separator must be ',' or '.', got '{}'",
                    self.decimal_separator
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn with_match_method(mut self, strategies: Vec<MatchStrategy>) -> Self {
        self.match_method = strategies;
        self
    }

    #[must_use]
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_remove_string(mut self, text: impl Into<String>) -> Self {
        self.remove_strings.push(text.into());
        self
    }

    #[must_use]
    pub fn with_replace_string(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.replace_strings.push((from.into(), to.into()));
        self
    }

    #[must_use]
    pub fn with_merge_group<S: Into<String>>(mut self, group: impl IntoIterator<Item = S>) -> Self {
        self.merge_columns
            .push(group.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_drop_column(mut self, column: impl Into<String>) -> Self {
        self.drop_columns.push(column.into());
        self
    }

    #[must_use]
    pub fn with_target_units(mut self, target: TargetUnits) -> Self {
        self.target_units = Some(target);
        self
    }

    #[must_use]
    pub fn with_override_unit(mut self, name: impl Into<String>, unit: impl Into<String>) -> Self {
        self.override_units.insert(name.into(), unit.into());
        self
    }

    #[must_use]
    pub fn with_detection_limit(mut self, policy: DetectionLimitPolicy) -> Self {
        self.detection_limit = policy;
        self
    }

    #[must_use]
    pub fn with_infer_units_from_names(mut self, enable: bool) -> Self {
        self.infer_units_from_names = enable;
        self
    }

    pub fn text_rules(&self) -> TextRules {
        TextRules {
            replace_strings: self.replace_strings.clone(),
            remove_strings: self.remove_strings.clone(),
            strip_parentheses: self.strip_parentheses,
        }
    }

    pub fn match_options(&self) -> MatchOptions {
        let threshold = if self.fuzzy_length_scaled {
            FuzzyThreshold::ByLength
        } else {
            FuzzyThreshold::Fixed(self.fuzzy_threshold)
        };
        MatchOptions::new()
            .with_text_rules(self.text_rules())
            .with_threshold(threshold)
            .with_scorer(self.fuzzy_scorer)
    }

    pub fn number_format(&self) -> NumberFormat {
        NumberFormat {
            lt_symbol: self.lt_symbol.clone(),
            decimal_separator: self.decimal_separator,
        }
    }

    pub fn unit_parser(&self) -> UnitParser {
        match &self.unit_replace_strings {
            Some(replacements) => UnitParser::with_replacements(replacements.iter().cloned()),
            None => UnitParser::new(),
        }
    }
}
