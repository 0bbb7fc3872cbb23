//! Choosing a destination deck from a note's tags.
//!
//! [`route`] is the single decision function. [`on_note_added`] applies it to one new
//! note and [`sort_collection`] sweeps a snapshot of every note; both only return
//! relocations, the caller applies them.

use std::collections::{
    BTreeMap,
    HashSet,
};

use serde::{
    Deserialize,
    Serialize,
};

pub const DEFAULT_PROTECTED_DECKS: &[&str] = &["Government Agencies", "Food", "Linguistics", "People"];

/// Ordered `(tag, deck)` pairs plus decks that are never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckRoutingRule {
    pub entries: Vec<(String, String)>,
    pub excluded_destinations: HashSet<String>,
}

impl Default for DeckRoutingRule {
    fn default() -> Self {
        DeckSortConfig::default().rule()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    MoveTo(String),
    NoOp,
}

/// Decide the destination for a note currently in `current_deck`.
///
/// Exclusions are checked before any tag; otherwise the first rule entry whose tag is
/// on the note (ignoring case) wins.
pub fn route(tags: &HashSet<String>, current_deck: &str, rule: &DeckRoutingRule) -> RouteDecision {
    if rule.excluded_destinations.contains(current_deck) {
        return RouteDecision::NoOp;
    }

    let tags: HashSet<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    rule.entries
        .iter()
        .find(|(tag, _)| tags.contains(&tag.to_lowercase()))
        .map(|(_, deck)| RouteDecision::MoveTo(deck.clone()))
        .unwrap_or(RouteDecision::NoOp)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPlacement {
    pub card_id: u64,
    pub deck: String,
}

/// What the router needs to know about a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePlacement {
    pub note_id: u64,
    pub tags: HashSet<String>,
    pub cards: Vec<CardPlacement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub note_id: u64,
    pub card_ids: Vec<u64>,
    pub deck: String,
}

/// Cards of one note that have to move. `None` when nothing changes.
pub fn relocate(note: &NotePlacement, rule: &DeckRoutingRule) -> Option<Relocation> {
    let mut target = None;
    let mut card_ids = Vec::new();

    for card in &note.cards {
        if let RouteDecision::MoveTo(deck) = route(&note.tags, &card.deck, rule) {
            if deck != card.deck {
                card_ids.push(card.card_id);
            }
            target = Some(deck);
        }
    }

    let deck = target?;
    (!card_ids.is_empty()).then_some(Relocation { note_id: note.note_id, card_ids, deck })
}

pub fn sort_collection(notes: &[NotePlacement], rule: &DeckRoutingRule) -> Vec<Relocation> {
    notes.iter().filter_map(|note| relocate(note, rule)).collect()
}

pub fn on_note_added(note: &NotePlacement, config: &DeckSortConfig) -> Option<Relocation> {
    if !config.auto_sort_on_add {
        return None;
    }
    relocate(note, &config.rule())
}

/// User-facing routing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckSortConfig {
    pub tag_to_deck: BTreeMap<String, String>,
    pub priority: Vec<String>,
    pub protected_decks: Vec<String>,
    pub auto_sort_on_add: bool,
}

impl Default for DeckSortConfig {
    fn default() -> Self {
        let pairs = [
            ("jlpt_n2", "0_JLPT N2"),
            ("jlpt_n1", "1_JLPT N1"),
            ("jlpt_n3", "JLPT N3"),
            ("jlpt_n4", "JLPT N4"),
            ("jlpt_n5", "JLPT N5"),
        ];
        Self {
            tag_to_deck: pairs.iter().map(|(t, d)| (t.to_string(), d.to_string())).collect(),
            priority: pairs.iter().map(|(t, _)| t.to_string()).collect(),
            protected_decks: DEFAULT_PROTECTED_DECKS.iter().map(|d| d.to_string()).collect(),
            auto_sort_on_add: true,
        }
    }
}

impl DeckSortConfig {
    /// Priority order; tags without a mapped deck are left out.
    pub fn rule(&self) -> DeckRoutingRule {
        let mapping: BTreeMap<String, &String> =
            self.tag_to_deck.iter().map(|(tag, deck)| (tag.to_lowercase(), deck)).collect();

        let entries = self
            .priority
            .iter()
            .filter_map(|tag| {
                mapping.get(&tag.to_lowercase()).map(|deck| (tag.clone(), (*deck).clone()))
            })
            .collect();

        DeckRoutingRule {
            entries,
            excluded_destinations: self.protected_decks.iter().cloned().collect(),
        }
    }

    /// Layer a user's settings over this one: `tag_to_deck` merges entry by entry,
    /// every other key present in `overrides` replaces the current value.
    pub fn merged_with(mut self, overrides: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let Some(object) = overrides.as_object() else {
            return Ok(self);
        };
        if let Some(map) = object.get("tag_to_deck") {
            let extra: BTreeMap<String, String> = serde_json::from_value(map.clone())?;
            self.tag_to_deck.extend(extra);
        }
        if let Some(priority) = object.get("priority") {
            self.priority = serde_json::from_value(priority.clone())?;
        }
        if let Some(protected) = object.get("protected_decks") {
            self.protected_decks = serde_json::from_value(protected.clone())?;
        }
        if let Some(auto) = object.get("auto_sort_on_add") {
            self.auto_sort_on_add = serde_json::from_value(auto.clone())?;
        }
        Ok(self)
    }
}
