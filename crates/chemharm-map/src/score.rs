//! Token based similarity scores on a 0-100 scale.
//!
//! Both scorers build on the normalized Indel similarity from `rapidfuzz`
//! and operate on whitespace separated tokens, so word order and repeated
//! words do not matter.

use std::collections::BTreeSet;

use rapidfuzz::distance::indel;
use serde::{Deserialize, Serialize};

/// Scorer used by the fuzzy strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyScorer {
    /// Compares the shared tokens against each side's remainder. A name
    /// whose tokens are a subset of the other's scores 100.
    #[default]
    TokenSet,
    /// Compares the sorted token sequences.
    TokenSort,
}

impl FuzzyScorer {
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Self::TokenSet => token_set_ratio(a, b),
            Self::TokenSort => token_sort_ratio(a, b),
        }
    }
}

/// Minimum score a fuzzy candidate must reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FuzzyThreshold {
    Fixed(f64),
    /// Stricter for short names, interpolated from [`LENGTH_THRESHOLDS`].
    ByLength,
}

impl Default for FuzzyThreshold {
    fn default() -> Self {
        Self::Fixed(100.0)
    }
}

/// `(input length, minimum score)` anchors for [`FuzzyThreshold::ByLength`].
pub const LENGTH_THRESHOLDS: [(f64, f64); 5] =
    [(1.0, 100.0), (3.0, 100.0), (4.0, 90.0), (5.0, 85.0), (6.0, 80.0)];

impl FuzzyThreshold {
    pub fn min_score(&self, input: &str) -> f64 {
        match self {
            Self::Fixed(score) => *score,
            Self::ByLength => interpolate(input.chars().count() as f64, &LENGTH_THRESHOLDS),
        }
    }
}

fn interpolate(x: f64, anchors: &[(f64, f64)]) -> f64 {
    let Some(&(first_x, first_y)) = anchors.first() else {
        return 100.0;
    };
    if x <= first_x {
        return first_y;
    }
    for pair in anchors.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            return y0 + (y1 - y0) * (x - x0) / (x1 - x0);
        }
    }
    anchors.last().map_or(100.0, |&(_, y)| y)
}

/// Plain Indel similarity between two strings.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    indel::normalized_similarity(a.chars(), b.chars()) * 100.0
}

pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let left = sorted_tokens(a);
    let right = sorted_tokens(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    ratio(&left.join(" "), &right.join(" "))
}

pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let left: BTreeSet<&str> = a.split_whitespace().collect();
    let right: BTreeSet<&str> = b.split_whitespace().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = join(left.intersection(&right).copied());
    let only_left = join(left.difference(&right).copied());
    let only_right = join(right.difference(&left).copied());

    let with_left = concat(&shared, &only_left);
    let with_right = concat(&shared, &only_right);

    let mut best = ratio(&with_left, &with_right);
    if !shared.is_empty() {
        best = best
            .max(ratio(&shared, &with_left))
            .max(ratio(&shared, &with_right));
    }
    best
}

fn sorted_tokens(text: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

fn join<'a>(tokens: impl Iterator<Item = &'a str>) -> String {
    tokens.collect::<Vec<_>>().join(" ")
}

fn concat(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_full() {
        assert!((ratio("chloride", "chloride") - 100.0).abs() < 1e-9);
        assert!((token_set_ratio("total nitrogen", "nitrogen total") - 100.0).abs() < 1e-9);
        assert!((token_sort_ratio("total nitrogen", "nitrogen total") - 100.0).abs() < 1e-9);
    }

    #[test]
    fn token_set_rewards_subsets() {
        assert!((token_set_ratio("nitrate", "nitrate total") - 100.0).abs() < 1e-9);
        assert!(token_sort_ratio("nitrate", "nitrate total") < 100.0);
    }

    #[test]
    fn near_misses_score_below_full() {
        let score = token_set_ratio("chlorde", "chloride");
        assert!(score > 80.0 && score < 100.0, "score was {score}");
        assert_eq!(token_set_ratio("", "chloride"), 0.0);
    }

    #[test]
    fn length_threshold_interpolates() {
        let threshold = FuzzyThreshold::ByLength;
        assert_eq!(threshold.min_score("na"), 100.0);
        assert_eq!(threshold.min_score("zink"), 90.0);
        assert!((threshold.min_score("ijzer") - 85.0).abs() < 1e-9);
        assert_eq!(threshold.min_score("chloride"), 80.0);
        assert_eq!(FuzzyThreshold::default().min_score("x"), 100.0);
    }
}
