//! Resolution of raw feature names to canonical aliases.
//!
//! Strategies run in the order the caller gives them and the first one that
//! produces a match wins, even if a later strategy would score higher. With
//! a near-duplicate key in the dictionary, `[fuzzy, exact]` and
//! `[exact, fuzzy]` can therefore return different aliases.

use chemharm_model::{MatchMethod, MatchResult, MatchStrategy};
use tracing::trace;

use crate::dictionary::{DictionaryEntry, MappingDictionary};
use crate::normalize::{TextRules, tidy};
use crate::score::{FuzzyScorer, FuzzyThreshold};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOptions {
    pub text_rules: TextRules,
    pub fuzzy_threshold: FuzzyThreshold,
    pub scorer: FuzzyScorer,
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_text_rules(mut self, rules: TextRules) -> Self {
        self.text_rules = rules;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: FuzzyThreshold) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_scorer(mut self, scorer: FuzzyScorer) -> Self {
        self.scorer = scorer;
        self
    }
}

/// Matches one raw name.
///
/// The text rules are applied once up front. When no strategy matches, the
/// result carries `method = none` and the preprocessed input as alias.
pub fn match_name(
    raw: &str,
    strategies: &[MatchStrategy],
    dictionary: &MappingDictionary,
    options: &MatchOptions,
) -> MatchResult {
    let prepared = options.text_rules.apply(raw);
    for &strategy in strategies {
        if let Some((entry, score)) = try_strategy(strategy, &prepared, dictionary, options) {
            trace!(input = raw, key = %entry.search_key, method = ?strategy, score, "name matched");
            return MatchResult::matched(
                raw,
                entry.search_key.clone(),
                entry.alias.clone(),
                strategy.as_method(),
                score,
            );
        }
    }
    let fallback = if prepared.is_empty() {
        raw.trim().to_string()
    } else {
        prepared
    };
    trace!(input = raw, alias = %fallback, "no match, keeping name");
    MatchResult::unmatched(raw, fallback)
}

fn try_strategy<'d>(
    strategy: MatchStrategy,
    prepared: &str,
    dictionary: &'d MappingDictionary,
    options: &MatchOptions,
) -> Option<(&'d DictionaryEntry, f64)> {
    match strategy {
        MatchStrategy::Exact => dictionary.lookup_exact(prepared).map(|entry| (entry, 100.0)),
        MatchStrategy::Ascii => {
            if tidy(prepared).is_empty() {
                return None;
            }
            dictionary.lookup_tidy(prepared).map(|entry| (entry, 100.0))
        }
        MatchStrategy::Fuzzy => best_fuzzy(prepared, dictionary, options),
        MatchStrategy::Regex => dictionary
            .lookup_pattern(prepared)
            .map(|entry| (entry, 100.0)),
    }
}

/// Highest scoring candidate; the earliest one wins ties.
fn best_fuzzy<'d>(
    prepared: &str,
    dictionary: &'d MappingDictionary,
    options: &MatchOptions,
) -> Option<(&'d DictionaryEntry, f64)> {
    let query = tidy(prepared);
    if query.is_empty() {
        return None;
    }
    let mut best: Option<(&DictionaryEntry, f64)> = None;
    for (entry, candidate) in dictionary.fuzzy_candidates() {
        let score = options.scorer.score(&query, candidate);
        if best.is_none_or(|(_, current)| score > current) {
            best = Some((entry, score));
        }
    }
    let minimum = options.fuzzy_threshold.min_score(&query);
    best.filter(|(_, score)| *score >= minimum)
}

/// A dictionary bound to a strategy list and options.
#[derive(Debug, Clone)]
pub struct MatchEngine<'a> {
    dictionary: &'a MappingDictionary,
    strategies: Vec<MatchStrategy>,
    options: MatchOptions,
}

impl<'a> MatchEngine<'a> {
    pub fn new(dictionary: &'a MappingDictionary, strategies: Vec<MatchStrategy>) -> Self {
        Self {
            dictionary,
            strategies,
            options: MatchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn strategies(&self) -> &[MatchStrategy] {
        &self.strategies
    }

    pub fn match_name(&self, raw: &str) -> MatchResult {
        match_name(raw, &self.strategies, self.dictionary, &self.options)
    }

    pub fn match_all<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> Vec<MatchResult> {
        names.into_iter().map(|name| self.match_name(name)).collect()
    }

    /// Counts results per method, for summaries.
    pub fn count_by_method(results: &[MatchResult]) -> Vec<(MatchMethod, usize)> {
        let methods = [
            MatchMethod::Exact,
            MatchMethod::Ascii,
            MatchMethod::Fuzzy,
            MatchMethod::Regex,
            MatchMethod::None,
        ];
        methods
            .into_iter()
            .map(|method| {
                let count = results.iter().filter(|r| r.method == method).count();
                (method, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}
