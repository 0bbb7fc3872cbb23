use std::collections::{
    BTreeMap,
    BTreeSet,
    HashMap,
    HashSet,
};

use super::{
    NewNote,
    NoteStore,
    StoredNote,
};
use crate::{
    core::TangoError,
    routing::{
        CardPlacement,
        NotePlacement,
    },
};

#[derive(Debug, Clone)]
struct MemoryNote {
    note_type: String,
    fields: HashMap<String, String>,
    tags: BTreeSet<String>,
    cards: Vec<u64>,
}

/// In-process collection. Every note gets one card in the deck it was added to.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    note_types: HashMap<String, Vec<String>>,
    notes: BTreeMap<u64, MemoryNote>,
    card_decks: BTreeMap<u64, String>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { next_id: 1, ..Default::default() }
    }

    pub fn with_note_type(mut self, name: &str, fields: &[&str]) -> Self {
        self.note_types.insert(name.to_string(), fields.iter().map(|f| f.to_string()).collect());
        self
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    pub fn note(&self, note_id: u64) -> Option<StoredNote> {
        self.notes.get(&note_id).map(|note| StoredNote {
            note_id,
            note_type: note.note_type.clone(),
            fields: note.fields.clone(),
            tags: note.tags.clone(),
        })
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Decks of the note's cards, in card order.
    pub fn decks_of(&self, note_id: u64) -> Vec<String> {
        self.notes
            .get(&note_id)
            .map(|note| note.cards.iter().filter_map(|c| self.card_decks.get(c).cloned()).collect())
            .unwrap_or_default()
    }

    /// Add a card for an existing note in `deck`; returns the card id.
    pub fn add_card(&mut self, note_id: u64, deck: &str) -> Result<u64, TangoError> {
        if !self.notes.contains_key(&note_id) {
            return Err(TangoError::AnkiConnect(format!("note was not found: {}", note_id)));
        }
        let card_id = self.allocate_id();
        self.card_decks.insert(card_id, deck.to_string());
        if let Some(note) = self.notes.get_mut(&note_id) {
            note.cards.push(card_id);
        }
        Ok(card_id)
    }
}

impl NoteStore for MemoryStore {
    fn field_names(&self, note_type: &str) -> Result<Option<Vec<String>>, TangoError> {
        Ok(self.note_types.get(note_type).cloned())
    }

    fn existing_keys(&self, note_type: &str, key_field: &str) -> Result<HashSet<String>, TangoError> {
        Ok(self
            .notes
            .values()
            .filter(|note| note.note_type == note_type)
            .filter_map(|note| note.fields.get(key_field).map(|v| v.trim().to_string()))
            .filter(|key| !key.is_empty())
            .collect())
    }

    fn add_note(&mut self, note: &NewNote) -> Result<u64, TangoError> {
        let Some(known_fields) = self.note_types.get(&note.note_type) else {
            return Err(TangoError::AnkiConnect(format!("model was not found: {}", note.note_type)));
        };
        if let Some(unknown) = note.fields.keys().find(|f| !known_fields.contains(f)) {
            return Err(TangoError::AnkiConnect(format!("field was not found: {}", unknown)));
        }

        let note_id = self.allocate_id();
        self.notes.insert(
            note_id,
            MemoryNote {
                note_type: note.note_type.clone(),
                fields: note.fields.clone(),
                tags: note.tags.clone(),
                cards: Vec::new(),
            },
        );
        self.add_card(note_id, &note.deck)?;
        Ok(note_id)
    }

    fn notes(&self, note_ids: &[u64]) -> Result<Vec<StoredNote>, TangoError> {
        Ok(note_ids.iter().filter_map(|id| self.note(*id)).collect())
    }

    fn update_note(
        &mut self,
        note_id: u64,
        fields: &HashMap<String, String>,
        tags: &BTreeSet<String>,
    ) -> Result<(), TangoError> {
        let note = self
            .notes
            .get_mut(&note_id)
            .ok_or_else(|| TangoError::AnkiConnect(format!("note was not found: {}", note_id)))?;
        note.fields.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        note.tags.extend(tags.iter().cloned());
        Ok(())
    }

    fn all_note_ids(&self) -> Result<Vec<u64>, TangoError> {
        Ok(self.notes.keys().copied().collect())
    }

    fn note_placements(&self, note_ids: &[u64]) -> Result<Vec<NotePlacement>, TangoError> {
        Ok(note_ids
            .iter()
            .filter_map(|id| self.notes.get(id).map(|note| (*id, note)))
            .map(|(note_id, note)| NotePlacement {
                note_id,
                tags: note.tags.iter().cloned().collect(),
                cards: note
                    .cards
                    .iter()
                    .filter_map(|card_id| {
                        self.card_decks
                            .get(card_id)
                            .map(|deck| CardPlacement { card_id: *card_id, deck: deck.clone() })
                    })
                    .collect(),
            })
            .collect())
    }

    fn move_cards(&mut self, card_ids: &[u64], deck: &str) -> Result<(), TangoError> {
        for card_id in card_ids {
            match self.card_decks.get_mut(card_id) {
                Some(current) => *current = deck.to_string(),
                None => {
                    return Err(TangoError::AnkiConnect(format!("card was not found: {}", card_id)))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_note(key: &str, deck: &str) -> NewNote {
        NewNote {
            note_type: "Basic".to_string(),
            deck: deck.to_string(),
            fields: HashMap::from([("Front".to_string(), key.to_string())]),
            tags: BTreeSet::from(["JLPT_N4".to_string()]),
        }
    }

    #[test]
    fn added_notes_are_visible_as_keys_and_placements() {
        let mut store = MemoryStore::new().with_note_type("Basic", &["Front", "Back"]);
        let id = store.add_note(&new_note(" 犬 ", "Default")).unwrap();

        assert_eq!(store.field_names("Basic").unwrap().unwrap(), vec!["Front", "Back"]);
        assert_eq!(store.field_names("Cloze").unwrap(), None);
        assert!(store.existing_keys("Basic", "Front").unwrap().contains("犬"));

        let placements = store.note_placements(&[id]).unwrap();
        assert_eq!(placements[0].cards[0].deck, "Default");
        assert!(placements[0].tags.contains("JLPT_N4"));
    }

    #[test]
    fn unknown_fields_and_types_are_rejected() {
        let mut store = MemoryStore::new().with_note_type("Basic", &["Front"]);
        let mut note = new_note("犬", "Default");
        note.fields.insert("Extra".to_string(), "x".to_string());
        assert!(matches!(store.add_note(&note), Err(TangoError::AnkiConnect(_))));

        note.note_type = "Cloze".to_string();
        assert!(store.add_note(&note).is_err());
        assert_eq!(store.note_count(), 0);
    }

    #[test]
    fn move_and_update() {
        let mut store = MemoryStore::new().with_note_type("Basic", &["Front", "Back"]);
        let id = store.add_note(&new_note("犬", "Default")).unwrap();
        let second = store.add_card(id, "Food").unwrap();

        store.move_cards(&[second], "JLPT N4").unwrap();
        assert_eq!(store.decks_of(id), vec!["Default", "JLPT N4"]);

        let fields = HashMap::from([("Back".to_string(), "dog".to_string())]);
        store.update_note(id, &fields, &BTreeSet::from(["extra".to_string()])).unwrap();
        let note = store.note(id).unwrap();
        assert_eq!(note.fields["Back"], "dog");
        assert_eq!(note.fields["Front"], "犬");
        assert_eq!(note.tags.len(), 2);
    }
}
