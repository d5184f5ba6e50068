//! Curated multi-vocabulary table of substance names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};

const BUNDLED_FEATURE_TABLE: &str = include_str!("../data/default_feature_map.json");

/// One substance with its names per vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub names: BTreeMap<String, Vec<String>>,
}

impl FeatureRecord {
    pub fn names(&self, vocabulary: &str) -> &[String] {
        self.names.get(vocabulary).map_or(&[], Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub vocabularies: Vec<String>,
    pub records: Vec<FeatureRecord>,
}

impl FeatureTable {
    /// Table shipped with the crate: common hydrochemical substances with
    /// `feature`, `formula`, `english`, `dutch` and `cas` names.
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_FEATURE_TABLE)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn has_vocabulary(&self, vocabulary: &str) -> bool {
        self.vocabularies.iter().any(|v| v == vocabulary)
    }

    pub(crate) fn require_vocabulary(&self, vocabulary: &str) -> Result<()> {
        if self.has_vocabulary(vocabulary) {
            Ok(())
        } else {
            Err(MapError::UnknownVocabulary {
                vocabulary: vocabulary.to_string(),
                available: self.vocabularies.join(", "),
            })
        }
    }
}
