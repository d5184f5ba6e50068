//! Text normalization applied to raw feature names before matching.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)|\[[^\[\]]*\]").expect("valid parentheses regex"));

static TRAILING_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.*?)\s*[(\[](?P<unit>[^()\[\]]*)[)\]]\s*$")
        .expect("valid trailing unit regex")
});

/// Literal substitutions and removals applied once per input.
///
/// Replacements run first, in list order, then removals, then the optional
/// parenthesis stripping. Whitespace is collapsed at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRules {
    #[serde(default)]
    pub replace_strings: Vec<(String, String)>,
    #[serde(default)]
    pub remove_strings: Vec<String>,
    #[serde(default)]
    pub strip_parentheses: bool,
}

impl TextRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diacritics, micro and percent signs, plus the method annotations
    /// Dutch laboratories append to substance names.
    pub fn hydrochemistry() -> Self {
        let replace = [
            ("Ä", "a"),
            ("ä", "a"),
            ("Ë", "e"),
            ("ë", "e"),
            ("Ö", "o"),
            ("ö", "o"),
            ("Ï", "i"),
            ("ï", "i"),
            ("μ", "u"),
            ("µ", "u"),
            ("%", "percentage"),
        ];
        let remove = [
            "icpms",
            "icpaes",
            "gf aas",
            "icp",
            "koude damp aas",
            "koude damp",
            "berekend",
            "opdrachtgever",
            "gehalte",
            "kretl",
            "tijdens meting",
            "na destructie",
            "destructie",
            "na aanzuren",
            "aanzuren",
            "bij",
        ];
        Self {
            replace_strings: replace
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
            remove_strings: remove.iter().map(|s| (*s).to_string()).collect(),
            strip_parentheses: false,
        }
    }

    #[must_use]
    pub fn with_replacement(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.replace_strings.push((from.into(), to.into()));
        self
    }

    #[must_use]
    pub fn with_removal(mut self, text: impl Into<String>) -> Self {
        self.remove_strings.push(text.into());
        self
    }

    #[must_use]
    pub fn with_strip_parentheses(mut self, enable: bool) -> Self {
        self.strip_parentheses = enable;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.replace_strings.is_empty() && self.remove_strings.is_empty() && !self.strip_parentheses
    }

    pub fn apply(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        for (from, to) in &self.replace_strings {
            if !from.is_empty() {
                text = text.replace(from.as_str(), to);
            }
        }
        for needle in &self.remove_strings {
            if !needle.is_empty() {
                text = text.replace(needle.as_str(), "");
            }
        }
        if self.strip_parentheses {
            text = strip_parenthesized(&text);
        }
        collapse_whitespace(&text)
    }
}

/// Key used for exact lookups: trimmed, lowercased, single-spaced.
pub fn normalize_key(raw: &str) -> String {
    collapse_whitespace(&raw.to_lowercase())
}

/// Lowercase ASCII letters, digits and single spaces only.
pub fn tidy(raw: &str) -> String {
    let kept: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    collapse_whitespace(&kept)
}

pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes `(...)` and `[...]` groups, innermost first.
pub fn strip_parenthesized(raw: &str) -> String {
    let mut text = raw.to_string();
    loop {
        let next = PARENTHESIZED.replace_all(&text, " ").into_owned();
        if next == text {
            return collapse_whitespace(&text);
        }
        text = next;
    }
}

/// Splits a header such as `Na (mg/l)` into name and bracketed unit.
pub fn split_name_and_unit(header: &str) -> (String, Option<String>) {
    match TRAILING_UNIT.captures(header) {
        Some(caps) => {
            let name = collapse_whitespace(&caps["name"]);
            let unit = collapse_whitespace(&caps["unit"]);
            if name.is_empty() {
                (collapse_whitespace(header), None)
            } else {
                (name, (!unit.is_empty()).then_some(unit))
            }
        }
        None => (collapse_whitespace(header), None),
    }
}
