use std::fmt;

use serde::{Deserialize, Serialize};

/// A name-matching strategy, tried in caller order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Case and whitespace normalized equality.
    Exact,
    /// Equality after stripping non-ASCII and punctuation.
    Ascii,
    /// Token similarity above a threshold.
    Fuzzy,
    /// Dictionary entry patterns.
    Regex,
}

impl MatchStrategy {
    pub fn as_method(self) -> MatchMethod {
        match self {
            Self::Exact => MatchMethod::Exact,
            Self::Ascii => MatchMethod::Ascii,
            Self::Fuzzy => MatchMethod::Fuzzy,
            Self::Regex => MatchMethod::Regex,
        }
    }
}

/// How a match result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Ascii,
    Fuzzy,
    Regex,
    None,
}

impl MatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Ascii => "ascii",
            Self::Fuzzy => "fuzzy",
            Self::Regex => "regex",
            Self::None => "none",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of matching one raw name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub input: String,
    /// Dictionary key that matched, `None` for the identity fallback.
    pub matched_key: Option<String>,
    /// Canonical alias; the preprocessed input when nothing matched.
    pub alias: String,
    pub method: MatchMethod,
    /// Similarity in `[0, 100]`.
    pub score: f64,
}

impl MatchResult {
    pub fn matched(
        input: impl Into<String>,
        key: impl Into<String>,
        alias: impl Into<String>,
        method: MatchMethod,
        score: f64,
    ) -> Self {
        Self {
            input: input.into(),
            matched_key: Some(key.into()),
            alias: alias.into(),
            method,
            score: score.clamp(0.0, 100.0),
        }
    }

    pub fn unmatched(input: impl Into<String>, normalized: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            matched_key: None,
            alias: normalized.into(),
            method: MatchMethod::None,
            score: 0.0,
        }
    }

    pub fn is_match(&self) -> bool {
        self.method != MatchMethod::None
    }
}
