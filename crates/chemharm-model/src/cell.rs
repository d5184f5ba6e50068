//! Cell values as delivered by the ingestion layer and after normalization.

use serde::{Deserialize, Serialize};

/// Raw cell content before any interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    Text(String),
    Number(f64),
    Missing,
}

/// Decimal separator style observed in the raw text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimalStyle {
    #[default]
    Dot,
    Comma,
}

/// A single measurement cell.
///
/// `value` is `None` until the cell has been normalized (or when the raw
/// content is not numeric). Once set, it is always a plain `f64`, so the
/// decimal style only records provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub raw: RawValue,
    pub value: Option<f64>,
    /// Set when the raw text carried a less-than marker; `value` holds the
    /// reported limit.
    #[serde(default)]
    pub below_detection_limit: bool,
    #[serde(default)]
    pub decimal_style: DecimalStyle,
}

impl Cell {
    /// Creates an unparsed text cell.
    pub fn text(raw: impl Into<String>) -> Self {
        Self {
            raw: RawValue::Text(raw.into()),
            value: None,
            below_detection_limit: false,
            decimal_style: DecimalStyle::Dot,
        }
    }

    /// Creates a numeric cell. NaN is treated as missing.
    pub fn number(value: f64) -> Self {
        if value.is_nan() {
            return Self::missing();
        }
        Self {
            raw: RawValue::Number(value),
            value: Some(value),
            below_detection_limit: false,
            decimal_style: DecimalStyle::Dot,
        }
    }

    pub fn missing() -> Self {
        Self {
            raw: RawValue::Missing,
            value: None,
            below_detection_limit: false,
            decimal_style: DecimalStyle::Dot,
        }
    }

    /// True when the cell carries no usable content.
    pub fn is_missing(&self) -> bool {
        match &self.raw {
            RawValue::Missing => self.value.is_none(),
            RawValue::Number(n) => n.is_nan() && self.value.is_none(),
            RawValue::Text(text) => text.trim().is_empty() && self.value.is_none(),
        }
    }

    /// True once a numeric value has been assigned.
    pub fn is_normalized(&self) -> bool {
        self.value.is_some()
    }

    /// Returns the raw content as display text.
    pub fn raw_text(&self) -> String {
        match &self.raw {
            RawValue::Text(text) => text.clone(),
            RawValue::Number(n) => n.to_string(),
            RawValue::Missing => String::new(),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or_else(Self::missing, Self::number)
    }
}
