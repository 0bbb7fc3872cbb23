use std::collections::{
    BTreeSet,
    HashMap,
    HashSet,
};

use crate::{
    core::{
        TangoError,
        VocabularyRecord,
    },
    routing::NotePlacement,
};

pub mod api;
pub mod memory;

pub use api::AnkiConnect;
pub use memory::MemoryStore;

pub const VOCAB_NOTE_TYPE: &str = "Vocab Front and Back";

pub const FIELD_KANJI: &str = "kanji";
pub const FIELD_KANJI_FURIGANA: &str = "kanji_furigana";
pub const FIELD_KANA: &str = "kana";
pub const FIELD_POS: &str = "pos";
pub const FIELD_ENGLISH: &str = "english";
pub const EXAMPLE_FIELDS: [[&str; 3]; 2] = [
    ["ex1_ja", "ex1_ja_furigana", "ex1_en"],
    ["ex2_ja", "ex2_ja_furigana", "ex2_en"],
];

/// Every field of the vocabulary note type, in note order.
pub const VOCAB_FIELDS: [&str; 11] = [
    FIELD_KANJI,
    FIELD_KANJI_FURIGANA,
    FIELD_KANA,
    FIELD_POS,
    FIELD_ENGLISH,
    "ex1_ja",
    "ex1_ja_furigana",
    "ex1_en",
    "ex2_ja",
    "ex2_ja_furigana",
    "ex2_en",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub note_type: String,
    pub deck: String,
    pub fields: HashMap<String, String>,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub note_id: u64,
    pub note_type: String,
    pub fields: HashMap<String, String>,
    pub tags: BTreeSet<String>,
}

/// The flashcard collection this crate reads from and writes to.
pub trait NoteStore {
    /// `None` when the note type does not exist.
    fn field_names(&self, note_type: &str) -> Result<Option<Vec<String>>, TangoError>;

    /// Trimmed values of `key_field` across every note of `note_type`.
    fn existing_keys(&self, note_type: &str, key_field: &str) -> Result<HashSet<String>, TangoError>;

    fn add_note(&mut self, note: &NewNote) -> Result<u64, TangoError>;

    fn notes(&self, note_ids: &[u64]) -> Result<Vec<StoredNote>, TangoError>;

    /// Overwrite the given fields and add `tags` to the note's existing tags.
    fn update_note(
        &mut self,
        note_id: u64,
        fields: &HashMap<String, String>,
        tags: &BTreeSet<String>,
    ) -> Result<(), TangoError>;

    fn all_note_ids(&self) -> Result<Vec<u64>, TangoError>;

    fn note_placements(&self, note_ids: &[u64]) -> Result<Vec<NotePlacement>, TangoError>;

    fn move_cards(&mut self, card_ids: &[u64], deck: &str) -> Result<(), TangoError>;
}

/// Field used for duplicate detection: `kanji`, or the first field of the note type.
pub fn key_field(field_names: &[String]) -> Option<&str> {
    field_names
        .iter()
        .find(|f| f.as_str() == FIELD_KANJI)
        .or_else(|| field_names.first())
        .map(String::as_str)
}

/// Note fields for a record. The primary key always goes into `key_field`; every other
/// value is written only when the field exists on the note type and the value is non-empty.
pub fn note_fields(
    record: &VocabularyRecord,
    field_names: &[String],
    key_field: &str,
) -> HashMap<String, String> {
    let available: HashSet<&str> = field_names.iter().map(String::as_str).collect();
    let mut fields = HashMap::new();
    let mut set = |name: &str, value: &str| {
        if available.contains(name) && !value.is_empty() {
            fields.insert(name.to_string(), value.to_string());
        }
    };

    set(FIELD_KANJI_FURIGANA, record.primary_key());
    set(FIELD_KANA, &record.reading);
    set(FIELD_POS, &record.part_of_speech);
    set(FIELD_ENGLISH, &record.meaning);
    for (example, [ja, ja_furigana, en]) in record.examples.iter().zip(EXAMPLE_FIELDS) {
        set(ja, &example.text);
        set(ja_furigana, &example.annotated_text);
        set(en, &example.translation);
    }

    fields.insert(key_field.to_string(), record.primary_key().to_string());
    fields
}
