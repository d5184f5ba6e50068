use std::collections::HashMap;

use chemharm_map::{DictionaryEntry, FeatureTable, MapError, MappingDictionary};
use chemharm_model::IdentifierResolver;

struct FixedResolver {
    known: HashMap<&'static str, &'static str>,
}

impl IdentifierResolver for FixedResolver {
    fn resolve_identifier(&self, name: &str, source_lang: Option<&str>) -> Option<String> {
        assert_eq!(source_lang, Some("nl"));
        self.known.get(name).map(|id| (*id).to_string())
    }
}

#[test]
fn loads_flat_json_objects() {
    let dictionary =
        MappingDictionary::from_json_str(r#"{"Chloride": "Cl", "Natrium": "Na"}"#).expect("load");
    assert_eq!(dictionary.len(), 2);
    assert_eq!(
        dictionary.lookup_exact("natrium").map(|e| e.alias.as_str()),
        Some("Na")
    );
}

#[test]
fn loads_entry_lists_with_synonyms() {
    let json = r#"[
        {"search_key": "nitrate", "alias": "NO3", "synonyms": ["nitraat"]},
        {"search_key": "ammonium", "alias": "NH4", "patterns": ["^nh4"]}
    ]"#;
    let dictionary = MappingDictionary::from_json_str(json).expect("load");
    assert_eq!(dictionary.entries()[0].search_key, "nitrate");
    assert_eq!(
        dictionary.lookup_exact("Nitraat").map(|e| e.alias.as_str()),
        Some("NO3")
    );
    assert!(dictionary.lookup_pattern("nh4 opgelost").is_some());
}

#[test]
fn persists_and_reloads_in_order() {
    let dictionary = MappingDictionary::from_entries([
        DictionaryEntry::new("zink", "Zn"),
        DictionaryEntry::new("arseen", "As").with_synonym("arsenicum"),
    ])
    .expect("dictionary")
    .with_vocabulary("dutch");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dictionary.json");
    dictionary.write_to_path(&path).expect("write");

    let reloaded = MappingDictionary::from_path(&path).expect("reload");
    assert_eq!(reloaded.vocabulary(), Some("dutch"));
    assert_eq!(reloaded.entries(), dictionary.entries());
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.json");
    let error = MappingDictionary::from_path(&path).unwrap_err();
    assert!(matches!(error, MapError::Io { path: p, .. } if p == path));
}

#[test]
fn feature_table_rejects_unknown_vocabulary() {
    let table = FeatureTable::bundled().expect("bundled");
    let error = MappingDictionary::from_feature_table(&table, "german", "formula").unwrap_err();
    assert!(matches!(error, MapError::UnknownVocabulary { vocabulary, .. } if vocabulary == "german"));
}

#[test]
fn feature_table_explodes_key_vocabulary() {
    let table = FeatureTable::bundled().expect("bundled");
    let dictionary = MappingDictionary::from_feature_table(&table, "english", "dutch").expect("dict");
    assert_eq!(dictionary.vocabulary(), Some("english"));
    let sulfate = dictionary.lookup_exact("sulphate").expect("synonym");
    assert_eq!(sulfate.search_key, "sulfate");
    assert_eq!(sulfate.alias, "sulfaat");
}

#[test]
fn resolver_batch_skips_unresolved_names() {
    let resolver = FixedResolver {
        known: HashMap::from([("chloride", "16887-00-6"), ("nitraat", "14797-55-8")]),
    };
    let dictionary = MappingDictionary::from_resolver(
        ["chloride", "onbekend", "nitraat", "chloride"],
        &resolver,
        Some("nl"),
    )
    .expect("dictionary");
    assert_eq!(dictionary.len(), 2);
    assert_eq!(
        dictionary.lookup_exact("nitraat").map(|e| e.alias.as_str()),
        Some("14797-55-8")
    );
}
