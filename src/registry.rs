//! Animal class allow-listing and Russian translation.
//!
//! The registry is built once per detector from the loaded model's class
//! vocabulary and is read-only afterward. Exactly one allow-listing policy is
//! active per instance; the keyword and dictionary policies are deliberately
//! not mixed because they disagree on substring cases like "catfish".

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::classes::ClassTables;

/// How class names are matched against the animal tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
pub enum ClassPolicy {
    /// Allow a class if any fixed keyword is a substring of its lowercased
    /// name. Broad, with documented false positives.
    Keyword,
    /// Allow a class only if its lowercased name is an exact key of the
    /// translation dictionary. Precise, but misses untranslated classes.
    Dictionary,
}

impl ClassPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassPolicy::Keyword => "keyword",
            ClassPolicy::Dictionary => "dictionary",
        }
    }
}

/// What `localize` returns for a class name without a dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
pub enum TranslationFallback {
    /// Return the source class name unchanged.
    SourceName,
    /// Return an explicit "no translation" marker wrapping the source name.
    Marker,
}

/// Allow-listed class ids plus the translation lookup for one loaded model.
#[derive(Debug, Clone)]
pub struct AnimalClassRegistry {
    allowed: BTreeSet<u32>,
    names: BTreeMap<u32, String>,
    tables: ClassTables,
    policy: ClassPolicy,
    fallback: TranslationFallback,
}

impl AnimalClassRegistry {
    /// Build the allow-list by matching every vocabulary entry against the
    /// given tables under the given policy. Deterministic for a fixed input.
    pub fn build(
        names: &BTreeMap<u32, String>,
        tables: ClassTables,
        policy: ClassPolicy,
        fallback: TranslationFallback,
    ) -> Self {
        let allowed = names
            .iter()
            .filter(|(_, name)| match policy {
                ClassPolicy::Keyword => tables.matches_keyword(name),
                ClassPolicy::Dictionary => tables.translate(name).is_some(),
            })
            .map(|(id, _)| *id)
            .collect();

        Self {
            allowed,
            names: names.clone(),
            tables,
            policy,
            fallback,
        }
    }

    pub fn is_allowed(&self, class_id: u32) -> bool {
        self.allowed.contains(&class_id)
    }

    pub fn allowed_ids(&self) -> &BTreeSet<u32> {
        &self.allowed
    }

    /// Source class name for an id, if the vocabulary defines one.
    pub fn class_name(&self, class_id: u32) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    pub fn policy(&self) -> ClassPolicy {
        self.policy
    }

    /// Russian display name for a source class name. Untranslated names yield
    /// the configured fallback rather than silently leaking one behavior.
    pub fn localize(&self, name: &str) -> String {
        match self.tables.translate(name) {
            Some(ru) => ru.to_string(),
            None => match self.fallback {
                TranslationFallback::SourceName => name.to_string(),
                TranslationFallback::Marker => format!("перевод отсутствует ({name})"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::{COCO_CLASSES, MEGADETECTOR_CLASSES};

    fn vocabulary(names: &[&str]) -> BTreeMap<u32, String> {
        names
            .iter()
            .enumerate()
            .map(|(id, name)| (id as u32, name.to_string()))
            .collect()
    }

    fn keyword_registry(names: &[&str]) -> AnimalClassRegistry {
        AnimalClassRegistry::build(
            &vocabulary(names),
            ClassTables::default(),
            ClassPolicy::Keyword,
            TranslationFallback::SourceName,
        )
    }

    #[test]
    fn test_megadetector_allow_list() {
        let registry = keyword_registry(MEGADETECTOR_CLASSES);
        assert!(registry.is_allowed(0)); // animal
        assert!(!registry.is_allowed(1)); // person
        assert!(!registry.is_allowed(2)); // vehicle
    }

    #[test]
    fn test_unknown_class_id_not_allowed() {
        let registry = keyword_registry(MEGADETECTOR_CLASSES);
        assert!(!registry.is_allowed(99));
        assert_eq!(registry.class_name(99), None);
    }

    #[test]
    fn test_coco_keyword_allow_list_contains_animals() {
        let registry = keyword_registry(COCO_CLASSES);
        for id in [14u32, 15, 16, 17, 18, 19, 20, 21, 22, 23] {
            // bird .. giraffe
            assert!(registry.is_allowed(id), "expected id {id} to be allowed");
        }
        assert!(!registry.is_allowed(0)); // person
        assert!(!registry.is_allowed(2)); // car
    }

    #[test]
    fn test_keyword_policy_false_positives() {
        // COCO "hot dog" and "mouse" (the peripheral) slip through the
        // substring policy. This is the documented trade-off.
        let registry = keyword_registry(COCO_CLASSES);
        assert!(registry.is_allowed(52)); // hot dog
        assert!(registry.is_allowed(64)); // mouse
    }

    #[test]
    fn test_dictionary_policy_rejects_substring_matches() {
        let registry = AnimalClassRegistry::build(
            &vocabulary(&["catfish", "cat", "hot dog"]),
            ClassTables::default(),
            ClassPolicy::Dictionary,
            TranslationFallback::SourceName,
        );
        assert!(!registry.is_allowed(0)); // catfish: no dictionary key
        assert!(registry.is_allowed(1)); // cat
        assert!(!registry.is_allowed(2)); // hot dog

        let keyword = keyword_registry(&["catfish", "cat", "hot dog"]);
        assert!(keyword.is_allowed(0)); // the policies genuinely diverge
    }

    #[test]
    fn test_allow_list_is_idempotent() {
        let names = vocabulary(COCO_CLASSES);
        let a = AnimalClassRegistry::build(
            &names,
            ClassTables::default(),
            ClassPolicy::Keyword,
            TranslationFallback::SourceName,
        );
        let b = AnimalClassRegistry::build(
            &names,
            ClassTables::default(),
            ClassPolicy::Keyword,
            TranslationFallback::SourceName,
        );
        assert_eq!(a.allowed_ids(), b.allowed_ids());
    }

    #[test]
    fn test_localize_with_source_name_fallback() {
        let registry = keyword_registry(COCO_CLASSES);
        assert_eq!(registry.localize("dog"), "собака");
        assert_eq!(registry.localize("axolotl"), "axolotl");
    }

    #[test]
    fn test_localize_with_marker_fallback() {
        let registry = AnimalClassRegistry::build(
            &vocabulary(COCO_CLASSES),
            ClassTables::default(),
            ClassPolicy::Keyword,
            TranslationFallback::Marker,
        );
        assert_eq!(registry.localize("cat"), "кот");
        assert_eq!(registry.localize("axolotl"), "перевод отсутствует (axolotl)");
    }
}
