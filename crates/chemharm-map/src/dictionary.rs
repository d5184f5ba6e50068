//! Ordered mapping from search keys to canonical aliases.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use chemharm_model::IdentifierResolver;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MapError, Result};
use crate::feature_table::FeatureTable;
use crate::normalize::{normalize_key, tidy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub search_key: String,
    pub alias: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub synonyms: BTreeSet<String>,
    /// Case-insensitive patterns used by the regex strategy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}

impl DictionaryEntry {
    pub fn new(search_key: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            search_key: search_key.into(),
            alias: alias.into(),
            synonyms: BTreeSet::new(),
            patterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.insert(synonym.into());
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Search key followed by synonyms.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.search_key.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }
}

/// Accepted on-disk shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum DictionaryFile {
    Document {
        #[serde(default)]
        vocabulary: Option<String>,
        entries: Vec<DictionaryEntry>,
    },
    List(Vec<DictionaryEntry>),
    Flat(BTreeMap<String, String>),
}

#[derive(Serialize)]
struct DictionaryDocumentRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    vocabulary: Option<&'a str>,
    entries: &'a [DictionaryEntry],
}

/// Immutable once built; lookups are case normalized.
#[derive(Debug, Clone, Default)]
pub struct MappingDictionary {
    vocabulary: Option<String>,
    entries: Vec<DictionaryEntry>,
    keys: BTreeSet<String>,
    exact: HashMap<String, usize>,
    tidy: HashMap<String, usize>,
    candidates: Vec<(usize, String)>,
    patterns: Vec<(usize, Regex)>,
}

impl MappingDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dictionary, failing on duplicate keys or invalid patterns.
    pub fn from_entries(entries: impl IntoIterator<Item = DictionaryEntry>) -> Result<Self> {
        let mut dictionary = Self::new();
        for entry in entries {
            dictionary.push(entry)?;
        }
        Ok(dictionary)
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_entries(
            pairs
                .into_iter()
                .map(|(key, alias)| DictionaryEntry::new(key, alias)),
        )
    }

    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: impl Into<String>) -> Self {
        self.vocabulary = Some(vocabulary.into());
        self
    }

    /// Parses a dictionary document, a bare entry list or a flat
    /// `{key: alias}` object. Flat objects load in key order.
    pub fn from_json_str(json: &str) -> Result<Self> {
        match serde_json::from_str::<DictionaryFile>(json)? {
            DictionaryFile::Document {
                vocabulary,
                entries,
            } => {
                let mut dictionary = Self::from_entries(entries)?;
                dictionary.vocabulary = vocabulary;
                Ok(dictionary)
            }
            DictionaryFile::List(entries) => Self::from_entries(entries),
            DictionaryFile::Flat(pairs) => Self::from_pairs(pairs),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        let document = DictionaryDocumentRef {
            vocabulary: self.vocabulary.as_deref(),
            entries: &self.entries,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        fs::write(path, json).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds a dictionary from two columns of a curated feature table.
    ///
    /// Every name in `key_vocabulary` becomes a search key or synonym of the
    /// record's first name in `alias_vocabulary`. Records without an alias
    /// are skipped, as are keys already claimed by an earlier record.
    pub fn from_feature_table(
        table: &FeatureTable,
        key_vocabulary: &str,
        alias_vocabulary: &str,
    ) -> Result<Self> {
        table.require_vocabulary(key_vocabulary)?;
        table.require_vocabulary(alias_vocabulary)?;
        let mut dictionary = Self::new().with_vocabulary(key_vocabulary);
        for record in table.records() {
            let Some(alias) = record.names(alias_vocabulary).first() else {
                continue;
            };
            let mut keys = record
                .names(key_vocabulary)
                .iter()
                .filter(|key| !dictionary.contains_key(key));
            let Some(search_key) = keys.next() else {
                continue;
            };
            let mut entry = DictionaryEntry::new(search_key.clone(), alias.clone());
            for synonym in keys {
                entry.synonyms.insert(synonym.clone());
            }
            dictionary.push(entry)?;
        }
        debug!(
            key_vocabulary,
            alias_vocabulary,
            entries = dictionary.len(),
            "built dictionary from feature table"
        );
        Ok(dictionary)
    }

    /// The dictionary built from the bundled feature table.
    pub fn bundled(key_vocabulary: &str, alias_vocabulary: &str) -> Result<Self> {
        Self::from_feature_table(&FeatureTable::bundled()?, key_vocabulary, alias_vocabulary)
    }

    /// Resolves every name through `resolver` in one pass; unresolved names
    /// are left out.
    pub fn from_resolver<I, S>(
        names: I,
        resolver: &dyn IdentifierResolver,
        source_lang: Option<&str>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dictionary = Self::new();
        for name in names {
            let name = name.as_ref();
            if name.trim().is_empty() || dictionary.contains_key(name) {
                continue;
            }
            match resolver.resolve_identifier(name, source_lang) {
                Some(identifier) => dictionary.push(DictionaryEntry::new(name, identifier))?,
                None => warn!(name, "identifier not resolved"),
            }
        }
        Ok(dictionary)
    }

    /// Appends an entry. Synonyms that collide with earlier names keep
    /// pointing at the earlier entry.
    pub fn push(&mut self, entry: DictionaryEntry) -> Result<()> {
        let key = normalize_key(&entry.search_key);
        if key.is_empty() {
            return Err(MapError::EmptyKey);
        }
        if self.keys.contains(&key) {
            return Err(MapError::DuplicateKey(entry.search_key));
        }
        let index = self.entries.len();
        let mut compiled = Vec::with_capacity(entry.patterns.len());
        for pattern in &entry.patterns {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| MapError::InvalidPattern {
                    key: entry.search_key.clone(),
                    pattern: pattern.clone(),
                    source: Box::new(source),
                })?;
            compiled.push((index, regex));
        }
        self.keys.insert(key);
        for name in entry.names() {
            self.exact.entry(normalize_key(name)).or_insert(index);
            let tidied = tidy(name);
            if !tidied.is_empty() {
                self.tidy.entry(tidied.clone()).or_insert(index);
                self.candidates.push((index, tidied));
            }
        }
        self.patterns.extend(compiled);
        self.entries.push(entry);
        Ok(())
    }

    pub fn vocabulary(&self) -> Option<&str> {
        self.vocabulary.as_deref()
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `name` is a search key (not merely a synonym).
    pub fn contains_key(&self, name: &str) -> bool {
        self.keys.contains(&normalize_key(name))
    }

    /// Case and whitespace normalized lookup over keys and synonyms.
    pub fn lookup_exact(&self, name: &str) -> Option<&DictionaryEntry> {
        self.exact
            .get(&normalize_key(name))
            .and_then(|&index| self.entries.get(index))
    }

    /// Lookup on the ASCII-tidied form of keys and synonyms.
    pub fn lookup_tidy(&self, name: &str) -> Option<&DictionaryEntry> {
        self.tidy
            .get(&tidy(name))
            .and_then(|&index| self.entries.get(index))
    }

    /// Tidied names in insertion order, for fuzzy scoring.
    pub fn fuzzy_candidates(&self) -> impl Iterator<Item = (&DictionaryEntry, &str)> {
        self.candidates
            .iter()
            .filter_map(|(index, name)| Some((self.entries.get(*index)?, name.as_str())))
    }

    /// First entry, in insertion order, with a pattern matching `text`.
    pub fn lookup_pattern(&self, text: &str) -> Option<&DictionaryEntry> {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(text))
            .and_then(|(index, _)| self.entries.get(*index))
    }
}
