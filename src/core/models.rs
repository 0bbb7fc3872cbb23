use std::collections::BTreeSet;

use serde::{
    Deserialize,
    Serialize,
};

/// One row of a source document, before any lookup has happened.
///
/// `word` is the phonetic form (kana), `kanji` the written headword. Either may
/// be empty; a mapping with both empty is never produced by a parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFieldMapping {
    pub word: String,
    pub kanji: String,
    pub meaning: String,
    pub kind: String, // "Type" column, a part-of-speech hint
}

impl RawFieldMapping {
    pub fn new(word: &str, kanji: &str, meaning: &str, kind: &str) -> Self {
        RawFieldMapping {
            word: word.trim().to_string(),
            kanji: kanji.trim().to_string(),
            meaning: meaning.trim().to_string(),
            kind: kind.trim().to_string(),
        }
    }

    /// Kanji when present, otherwise the phonetic form.
    pub fn primary_key(&self) -> Option<&str> {
        if !self.kanji.is_empty() {
            Some(&self.kanji)
        } else if !self.word.is_empty() {
            Some(&self.word)
        } else {
            None
        }
    }

    pub fn is_candidate(&self) -> bool {
        self.primary_key().is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamplePair {
    pub text: String,
    pub annotated_text: String, // <ruby> furigana markup
    pub translation: String,
}

/// Linguistic detail fetched for a headword from the reference site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub reading: String,
    pub part_of_speech: String,
    pub meaning: String,
    pub examples: Vec<ExamplePair>,
    pub level: String, // as reported by the source, e.g. "N2"
}

impl EnrichmentResult {
    pub fn level_tag(&self) -> Option<String> {
        ProficiencyLevel::from_indicator(&self.level).map(|level| level.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProficiencyLevel {
    N1,
    N2,
    N3,
    N4,
    N5,
}

impl ProficiencyLevel {
    pub const ALL: [ProficiencyLevel; 5] = [
        ProficiencyLevel::N1,
        ProficiencyLevel::N2,
        ProficiencyLevel::N3,
        ProficiencyLevel::N4,
        ProficiencyLevel::N5,
    ];

    pub fn from_indicator(indicator: &str) -> Option<Self> {
        match indicator.trim().to_ascii_uppercase().as_str() {
            "N1" => Some(ProficiencyLevel::N1),
            "N2" => Some(ProficiencyLevel::N2),
            "N3" => Some(ProficiencyLevel::N3),
            "N4" => Some(ProficiencyLevel::N4),
            "N5" => Some(ProficiencyLevel::N5),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            ProficiencyLevel::N1 => 1,
            ProficiencyLevel::N2 => 2,
            ProficiencyLevel::N3 => 3,
            ProficiencyLevel::N4 => 4,
            ProficiencyLevel::N5 => 5,
        }
    }

    pub fn tag(&self) -> String {
        format!("JLPT_N{}", self.number())
    }
}

/// Canonical unit handed to the note store.
///
/// Built only by [`crate::core::merge::merge`]; the primary key cannot change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabularyRecord {
    primary_key: String,
    pub reading: String,
    pub part_of_speech: String,
    pub meaning: String,
    pub examples: Vec<ExamplePair>,
    pub tags: BTreeSet<String>,
}

impl VocabularyRecord {
    pub(crate) fn new(primary_key: String) -> Self {
        VocabularyRecord {
            primary_key,
            reading: String::new(),
            part_of_speech: String::new(),
            meaning: String::new(),
            examples: Vec::new(),
            tags: BTreeSet::new(),
        }
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }
}
