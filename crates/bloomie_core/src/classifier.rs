//! crates/bloomie_core/src/classifier.rs
//!
//! Assigns a coarse activity category to free-text log descriptions.
//!
//! Matching is a single generic routine over a keyword table: rules are
//! tried in table order, keywords in rule order, and the first keyword that
//! occurs case-insensitively at the start of a word decides the category.
//! Keywords act as stems: "water" matches "watered" but "tick" does not
//! match "stick".

use serde::{Deserialize, Serialize};

use crate::domain::{ActivityCategory, NurtureKind};
use crate::text::{contains_phrase, Boundary};

/// One ordered group of keywords that map to a category for a nurture kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub kind: NurtureKind,
    pub category: ActivityCategory,
    pub keywords: Vec<String>,
}

/// The full, ordered keyword table. Order matters: earlier rules win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTable {
    pub rules: Vec<KeywordRule>,
}

// English and Turkish keywords. Within a kind, a keyword that another keyword
// is a prefix of must come after it ("sun" before "su", "nappy" before "nap").
// Watering is split in two so "water" still wins over "sun".
const BUILTIN_RULES: &[(NurtureKind, ActivityCategory, &[&str])] = &[
    (
        NurtureKind::Baby,
        ActivityCategory::Diaper,
        &["diaper", "nappy", "bez"],
    ),
    (
        NurtureKind::Baby,
        ActivityCategory::Feeding,
        &["feed", "fed", "bottle", "breast", "milk", "formula", "nurs", "mama", "emzir", "süt", "beslen"],
    ),
    (
        NurtureKind::Baby,
        ActivityCategory::Sleep,
        &["sleep", "slept", "nap", "uyku", "uyu"],
    ),
    (
        NurtureKind::Baby,
        ActivityCategory::Medicine,
        &["medicine", "vitamin", "drops", "ilaç"],
    ),
    (
        NurtureKind::Pet,
        ActivityCategory::Feeding,
        &["feed", "fed", "food", "meal", "kibble", "mama", "yem", "beslen"],
    ),
    (
        NurtureKind::Pet,
        ActivityCategory::Walking,
        &["walk", "yürü", "gezdir"],
    ),
    (
        NurtureKind::Pet,
        ActivityCategory::ParasiteTreatment,
        &["flea", "tick", "deworm", "parasite", "pire", "kene", "parazit"],
    ),
    (
        NurtureKind::Pet,
        ActivityCategory::Medicine,
        &["medicine", "pill", "vaccine", "vet", "ilaç", "aşı"],
    ),
    (
        NurtureKind::Plant,
        ActivityCategory::Watering,
        &["water"],
    ),
    (
        NurtureKind::Plant,
        ActivityCategory::Sunlight,
        &["sun", "güneş"],
    ),
    (
        NurtureKind::Plant,
        ActivityCategory::Watering,
        &["su"],
    ),
    (
        NurtureKind::Plant,
        ActivityCategory::Fertilizing,
        &["fertiliz", "gübre"],
    ),
];

impl KeywordTable {
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(kind, category, keywords)| KeywordRule {
                kind: *kind,
                category: *category,
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            })
            .collect();
        Self { rules }
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Case-insensitive, first-match-wins keyword classifier.
#[derive(Debug, Clone)]
pub struct ActivityClassifier {
    table: KeywordTable,
}

impl ActivityClassifier {
    /// Builds a classifier, lowercasing keywords and dropping empty ones
    /// (an empty keyword would match every text).
    pub fn new(mut table: KeywordTable) -> Self {
        for rule in &mut table.rules {
            rule.keywords = rule
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
        }
        Self { table }
    }

    pub fn classify(&self, text: &str, kind: NurtureKind) -> ActivityCategory {
        self.keywords_for(kind)
            .find(|(keyword, _)| contains_phrase(text, keyword, Boundary::WordStart))
            .map(|(_, category)| category)
            .unwrap_or(ActivityCategory::Other)
    }

    /// Every `(keyword, category)` pair for a kind, in matching order.
    pub fn keywords_for(&self, kind: NurtureKind) -> impl Iterator<Item = (&str, ActivityCategory)> {
        self.table
            .rules
            .iter()
            .filter(move |rule| rule.kind == kind)
            .flat_map(|rule| rule.keywords.iter().map(move |k| (k.as_str(), rule.category)))
    }
}

impl Default for ActivityClassifier {
    fn default() -> Self {
        Self::new(KeywordTable::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plant_keywords_map_to_their_categories() {
        let classifier = ActivityClassifier::default();
        assert_eq!(classifier.classify("Watered the fern", NurtureKind::Plant), ActivityCategory::Watering);
        assert_eq!(classifier.classify("Bol su verdim", NurtureKind::Plant), ActivityCategory::Watering);
        assert_eq!(classifier.classify("Moved into the SUN", NurtureKind::Plant), ActivityCategory::Sunlight);
        assert_eq!(classifier.classify("gübre attım", NurtureKind::Plant), ActivityCategory::Fertilizing);
        assert_eq!(classifier.classify("Fertilized monthly", NurtureKind::Plant), ActivityCategory::Fertilizing);
    }

    #[test]
    fn first_rule_in_table_order_wins() {
        let classifier = ActivityClassifier::default();
        assert_eq!(
            classifier.classify("watered it and left it in the sun", NurtureKind::Plant),
            ActivityCategory::Watering
        );
        assert_eq!(
            classifier.classify("Watered the monstera and moved it into the sun", NurtureKind::Plant),
            ActivityCategory::Watering
        );
        assert_eq!(classifier.classify("left it in the sun", NurtureKind::Plant), ActivityCategory::Sunlight);
        assert_eq!(classifier.classify("changed nappy", NurtureKind::Baby), ActivityCategory::Diaper);
    }

    #[test]
    fn keywords_only_match_at_word_starts() {
        let classifier = ActivityClassifier::default();
        assert_eq!(
            classifier.classify("played fetch with a stick", NurtureKind::Pet),
            ActivityCategory::Other
        );
        assert_eq!(
            classifier.classify("found two ticks after the hike", NurtureKind::Pet),
            ActivityCategory::ParasiteTreatment
        );
        assert_eq!(classifier.classify("suyunu verdim", NurtureKind::Plant), ActivityCategory::Watering);
    }

    #[test]
    fn same_text_classifies_differently_per_kind() {
        let classifier = ActivityClassifier::default();
        assert_eq!(classifier.classify("went for a walk", NurtureKind::Pet), ActivityCategory::Walking);
        assert_eq!(classifier.classify("went for a walk", NurtureKind::Plant), ActivityCategory::Other);
    }

    #[test]
    fn unmatched_and_empty_text_fall_back_to_other() {
        let classifier = ActivityClassifier::default();
        for kind in NurtureKind::ALL {
            assert_eq!(classifier.classify("", kind), ActivityCategory::Other);
            assert_eq!(classifier.classify("xyz", kind), ActivityCategory::Other);
        }
    }

    #[test]
    fn custom_tables_are_normalized() {
        let table = KeywordTable {
            rules: vec![KeywordRule {
                kind: NurtureKind::Plant,
                category: ActivityCategory::Watering,
                keywords: vec!["".to_string(), "  MIST ".to_string()],
            }],
        };
        let classifier = ActivityClassifier::new(table);
        assert_eq!(classifier.classify("misted the leaves", NurtureKind::Plant), ActivityCategory::Watering);
        assert_eq!(classifier.classify("repotted", NurtureKind::Plant), ActivityCategory::Other);
    }
}
