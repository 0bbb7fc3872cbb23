use std::{
    collections::{
        BTreeSet,
        HashMap,
        HashSet,
    },
    time::Duration,
};

use reqwest::blocking::Client;
use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};
use serde_json::json;
use tracing::debug;

use super::{
    NewNote,
    NoteStore,
    StoredNote,
};
use crate::{
    core::{
        http::http_client,
        TangoError,
    },
    routing::{
        CardPlacement,
        NotePlacement,
    },
};

pub const DEFAULT_ANKI_URL: &str = "http://localhost:8765";
const API_VERSION: u32 = 6;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Field {
    pub value: String,
    order: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: u64,
    pub model_name: String,
    pub tags: Vec<String>,
    pub fields: HashMap<String, Field>,
    pub cards: Vec<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub card_id: u64,
    pub deck_name: String,
    pub note: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self, action: &str) -> Result<Option<T>, TangoError> {
        match self.error {
            Some(error) => Err(TangoError::AnkiConnect(format!("{}: {}", action, error))),
            None => Ok(self.result),
        }
    }
}

/// Blocking client for the AnkiConnect add-on.
pub struct AnkiConnect {
    client: Client,
    url: String,
}

impl AnkiConnect {
    pub fn new(url: &str) -> Result<Self, TangoError> {
        Ok(Self { client: http_client(REQUEST_TIMEOUT)?, url: url.to_string() })
    }

    fn request<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<serde_json::Value>,
    ) -> Result<Option<T>, TangoError> {
        let mut body = serde_json::Map::new();
        body.insert("action".to_string(), serde_json::Value::String(action.to_string()));
        body.insert("version".to_string(), serde_json::Value::Number(API_VERSION.into()));

        if let Some(params) = params {
            body.insert("params".to_string(), params);
        }

        debug!("AnkiConnect {}", action);
        let response: ApiResponse<T> =
            self.client.post(&self.url).json(&body).send()?.error_for_status()?.json()?;

        response.into_result(action)
    }

    /// Used to check whether AnkiConnect is reachable.
    pub fn version(&self) -> Result<u32, TangoError> {
        Ok(self.request("version", None)?.unwrap_or_default())
    }

    pub fn model_names(&self) -> Result<Vec<String>, TangoError> {
        Ok(self.request("modelNames", None)?.unwrap_or_default())
    }

    pub fn find_notes(&self, query: &str) -> Result<Vec<u64>, TangoError> {
        let params = json!({ "query": query });
        Ok(self.request("findNotes", Some(params))?.unwrap_or_default())
    }

    pub fn notes_info(&self, note_ids: &[u64]) -> Result<Vec<Note>, TangoError> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = json!({ "notes": note_ids });
        Ok(self.request("notesInfo", Some(params))?.unwrap_or_default())
    }

    pub fn cards_info(&self, card_ids: &[u64]) -> Result<Vec<Card>, TangoError> {
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = json!({ "cards": card_ids });
        Ok(self.request("cardsInfo", Some(params))?.unwrap_or_default())
    }
}

fn note_query(note_type: &str) -> String {
    format!("note:\"{}\"", note_type.replace('"', "\\\""))
}

impl NoteStore for AnkiConnect {
    fn field_names(&self, note_type: &str) -> Result<Option<Vec<String>>, TangoError> {
        if !self.model_names()?.iter().any(|name| name == note_type) {
            return Ok(None);
        }
        let params = json!({ "modelName": note_type });
        Ok(Some(self.request("modelFieldNames", Some(params))?.unwrap_or_default()))
    }

    fn existing_keys(&self, note_type: &str, key_field: &str) -> Result<HashSet<String>, TangoError> {
        let note_ids = self.find_notes(&note_query(note_type))?;
        Ok(self
            .notes_info(&note_ids)?
            .into_iter()
            .filter_map(|note| note.fields.get(key_field).map(|f| f.value.trim().to_string()))
            .filter(|key| !key.is_empty())
            .collect())
    }

    fn add_note(&mut self, note: &NewNote) -> Result<u64, TangoError> {
        // Duplicates are filtered by the caller
        let params = json!({
            "note": {
                "deckName": note.deck,
                "modelName": note.note_type,
                "fields": note.fields,
                "tags": note.tags,
                "options": { "allowDuplicate": true },
            }
        });
        self.request("addNote", Some(params))?
            .ok_or_else(|| TangoError::AnkiConnect("addNote returned no note id".to_string()))
    }

    fn notes(&self, note_ids: &[u64]) -> Result<Vec<StoredNote>, TangoError> {
        Ok(self
            .notes_info(note_ids)?
            .into_iter()
            .map(|note| StoredNote {
                note_id: note.note_id,
                note_type: note.model_name,
                fields: note.fields.into_iter().map(|(name, f)| (name, f.value)).collect(),
                tags: note.tags.into_iter().collect(),
            })
            .collect())
    }

    fn update_note(
        &mut self,
        note_id: u64,
        fields: &HashMap<String, String>,
        tags: &BTreeSet<String>,
    ) -> Result<(), TangoError> {
        if !fields.is_empty() {
            let params = json!({ "note": { "id": note_id, "fields": fields } });
            self.request::<serde_json::Value>("updateNoteFields", Some(params))?;
        }
        if !tags.is_empty() {
            let joined = tags.iter().cloned().collect::<Vec<_>>().join(" ");
            let params = json!({ "notes": [note_id], "tags": joined });
            self.request::<serde_json::Value>("addTags", Some(params))?;
        }
        Ok(())
    }

    fn all_note_ids(&self) -> Result<Vec<u64>, TangoError> {
        self.find_notes("deck:*")
    }

    fn note_placements(&self, note_ids: &[u64]) -> Result<Vec<NotePlacement>, TangoError> {
        let notes = self.notes_info(note_ids)?;
        let card_ids: Vec<u64> = notes.iter().flat_map(|n| n.cards.iter().copied()).collect();
        let decks: HashMap<u64, String> = self
            .cards_info(&card_ids)?
            .into_iter()
            .map(|card| (card.card_id, card.deck_name))
            .collect();

        Ok(notes
            .into_iter()
            .map(|note| NotePlacement {
                note_id: note.note_id,
                tags: note.tags.into_iter().collect(),
                cards: note
                    .cards
                    .iter()
                    .filter_map(|id| {
                        decks.get(id).map(|deck| CardPlacement { card_id: *id, deck: deck.clone() })
                    })
                    .collect(),
            })
            .collect())
    }

    fn move_cards(&mut self, card_ids: &[u64], deck: &str) -> Result<(), TangoError> {
        let params = json!({ "cards": card_ids, "deck": deck });
        self.request::<serde_json::Value>("changeDeck", Some(params))?;
        Ok(())
    }
}
