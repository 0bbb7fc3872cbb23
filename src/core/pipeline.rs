use std::{
    collections::{
        HashMap,
        HashSet,
    },
    fmt,
};

use serde::Serialize;
use tracing::{
    debug,
    info,
    warn,
};

use super::{
    dedup::KnownKeys,
    merge::merge,
    utils::StripHtml,
    EnrichmentResult,
    RawFieldMapping,
    TangoError,
    VocabularyRecord,
};
use crate::{
    anki::{
        key_field,
        note_fields,
        NewNote,
        NoteStore,
        FIELD_KANJI,
    },
    enrichment::{
        Enricher,
        NoEnrichment,
    },
    persistence::ImportSettings,
    routing::{
        on_note_added,
        sort_collection,
        DeckRoutingRule,
        DeckSortConfig,
        Relocation,
    },
    sources::SourceDocument,
};

const PROGRESS_EVERY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentStatus {
    Enriched,
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Emitted { record: VocabularyRecord, enrichment: EnrichmentStatus },
    Duplicate(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped_duplicate: usize,
    pub enriched: usize,
    pub not_found: usize,
    pub enrichment_failed: usize,
    pub write_failed: usize,
    pub moved_cards: usize,
    pub parse_errors: Vec<String>,
}

impl ImportSummary {
    fn count_enrichment(&mut self, status: &EnrichmentStatus) {
        match status {
            EnrichmentStatus::Enriched => self.enriched += 1,
            EnrichmentStatus::NotFound => self.not_found += 1,
            EnrichmentStatus::Failed(_) => self.enrichment_failed += 1,
        }
    }

    pub fn add_parse_errors(&mut self, errors: &[TangoError]) {
        self.parse_errors.extend(errors.iter().map(|e| e.to_string()));
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "imported {}, skipped {} duplicates, enrichment {} found / {} not found / {} failed",
            self.imported, self.skipped_duplicate, self.enriched, self.not_found, self.enrichment_failed
        )?;
        if self.write_failed > 0 {
            write!(f, ", {} notes could not be added", self.write_failed)?;
        }
        if self.moved_cards > 0 {
            write!(f, ", {} cards sorted", self.moved_cards)?;
        }
        if !self.parse_errors.is_empty() {
            write!(f, ", {} files failed to parse", self.parse_errors.len())?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FillSummary {
    pub filled: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl fmt::Display for FillSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "filled {}, skipped {}, not found {}, failed {}",
            self.filled, self.skipped, self.not_found, self.failed
        )
    }
}

/// parse → enrich → merge → dedup, one record at a time.
///
/// Built with either a live enricher or [`NoEnrichment`]; merging never needs to know which.
pub struct ImportPipeline<'e> {
    enricher: Box<dyn Enricher + 'e>,
}

impl ImportPipeline<'static> {
    pub fn without_enrichment() -> Self {
        Self::new(Box::new(NoEnrichment))
    }
}

impl<'e> ImportPipeline<'e> {
    pub fn new(enricher: Box<dyn Enricher + 'e>) -> Self {
        Self { enricher }
    }

    /// A lazy pass over `rows`. Each call to `next` handles one row completely, so dropping
    /// the iterator stops the import between records.
    pub fn pass<'a, I>(&'a self, rows: I, existing: &'a HashSet<String>) -> ImportPass<'a, I::IntoIter>
    where
        I: IntoIterator<Item = RawFieldMapping>,
    {
        ImportPass { enricher: &*self.enricher, rows: rows.into_iter(), known: KnownKeys::new(existing) }
    }

    /// Import every record of `documents` into `store`.
    ///
    /// The note type is checked before anything is written; a missing type or one without
    /// fields is a configuration error. Existing keys are read once, up front.
    pub fn import_into<S: NoteStore + ?Sized>(
        &self,
        store: &mut S,
        settings: &ImportSettings,
        documents: &[SourceDocument],
        deck_sort: Option<&DeckSortConfig>,
    ) -> Result<ImportSummary, TangoError> {
        let field_names = store.field_names(&settings.note_type)?.ok_or_else(|| {
            TangoError::Configuration(format!("Note type '{}' does not exist", settings.note_type))
        })?;
        let key_field = key_field(&field_names)
            .ok_or_else(|| {
                TangoError::Configuration(format!("Note type '{}' has no fields", settings.note_type))
            })?
            .to_string();

        let existing = store.existing_keys(&settings.note_type, &key_field)?;
        info!(
            "Importing {} documents into '{}' ({} existing notes keyed on '{}')",
            documents.len(),
            settings.deck,
            existing.len(),
            key_field
        );

        let mut summary = ImportSummary::default();
        let rows = documents.iter().flat_map(SourceDocument::records);

        let mut pass = self.pass(rows, &existing);
        while let Some(outcome) = pass.next() {
            let (record, enrichment) = match outcome {
                RowOutcome::Duplicate(key) => {
                    debug!("Skipping duplicate {}", key);
                    summary.skipped_duplicate += 1;
                    continue;
                }
                RowOutcome::Emitted { record, enrichment } => (record, enrichment),
            };
            summary.count_enrichment(&enrichment);

            let note = NewNote {
                note_type: settings.note_type.clone(),
                deck: settings.deck.clone(),
                fields: note_fields(&record, &field_names, &key_field),
                tags: record.tags.clone(),
            };
            let note_id = match store.add_note(&note) {
                Ok(id) => id,
                Err(e) => {
                    warn!("Failed to add {}: {}", record.primary_key(), e);
                    summary.write_failed += 1;
                    // A later row with the same key may still be written
                    pass.release(record.primary_key());
                    continue;
                }
            };

            summary.imported += 1;
            if summary.imported % PROGRESS_EVERY == 0 {
                info!("Imported {} notes", summary.imported);
            }

            if let Some(config) = deck_sort {
                match route_new_note(store, note_id, config) {
                    Ok(moved) => summary.moved_cards += moved,
                    Err(e) => warn!("Failed to sort note {}: {}", note_id, e),
                }
            }
        }

        info!("Import finished: {}", summary);
        Ok(summary)
    }
}

fn lookup(enricher: &dyn Enricher, headword: &str) -> (Option<EnrichmentResult>, EnrichmentStatus) {
    match enricher.enrich(headword) {
        Ok(Some(enrichment)) => (Some(enrichment), EnrichmentStatus::Enriched),
        Ok(None) => (None, EnrichmentStatus::NotFound),
        Err(e) => {
            warn!("Lookup for {} failed: {}", headword, e);
            (None, EnrichmentStatus::Failed(e.to_string()))
        }
    }
}

pub struct ImportPass<'a, I> {
    enricher: &'a dyn Enricher,
    rows: I,
    known: KnownKeys<'a>,
}

impl<I> ImportPass<'_, I> {
    /// Hand back a key emitted by this pass whose note never reached the store.
    pub fn release(&mut self, key: &str) {
        self.known.release(key);
    }
}

impl<I> Iterator for ImportPass<'_, I>
where
    I: Iterator<Item = RawFieldMapping>,
{
    type Item = RowOutcome;

    fn next(&mut self) -> Option<RowOutcome> {
        loop {
            let raw = self.rows.next()?;
            let Some(key) = raw.primary_key() else {
                continue;
            };
            // Duplicates are settled before any lookup
            if !self.known.claim(key) {
                return Some(RowOutcome::Duplicate(key.to_string()));
            }

            let (enrichment, status) = lookup(self.enricher, key);
            if let Some(record) = merge(&raw, enrichment.as_ref()) {
                return Some(RowOutcome::Emitted { record, enrichment: status });
            }
        }
    }
}

/// Look up each note's `kanji` and write the enrichment-owned fields plus the level tag.
///
/// Ids that do not resolve to a note count as skipped.
pub fn fill_existing_notes<S, E>(
    store: &mut S,
    enricher: &E,
    note_ids: &[u64],
) -> Result<FillSummary, TangoError>
where
    S: NoteStore + ?Sized,
    E: Enricher + ?Sized,
{
    let notes = store.notes(note_ids)?;
    let mut summary = FillSummary { skipped: note_ids.len().saturating_sub(notes.len()), ..Default::default() };
    let mut field_cache: HashMap<String, Vec<String>> = HashMap::new();

    for note in notes {
        let kanji = note.fields.get(FIELD_KANJI).map(|v| v.strip_html()).unwrap_or_default();
        if kanji.is_empty() {
            summary.skipped += 1;
            continue;
        }

        let enrichment = match enricher.enrich(&kanji) {
            Ok(Some(enrichment)) => enrichment,
            Ok(None) => {
                summary.not_found += 1;
                continue;
            }
            Err(e) => {
                warn!("Lookup for {} failed: {}", kanji, e);
                summary.failed += 1;
                continue;
            }
        };

        let raw = RawFieldMapping::new("", &kanji, "", "");
        let Some(record) = merge(&raw, Some(&enrichment)) else {
            summary.skipped += 1;
            continue;
        };
        if !field_cache.contains_key(&note.note_type) {
            let names = store.field_names(&note.note_type)?.unwrap_or_default();
            field_cache.insert(note.note_type.clone(), names);
        }
        let field_names = field_cache.get(&note.note_type).map(Vec::as_slice).unwrap_or(&[]);
        let mut fields = note_fields(&record, field_names, FIELD_KANJI);
        fields.remove(FIELD_KANJI);

        store.update_note(note.note_id, &fields, &record.tags)?;
        summary.filled += 1;
    }

    info!("Fill finished: {}", summary);
    Ok(summary)
}

/// Apply relocations; returns the number of cards moved.
pub fn apply_relocations<S: NoteStore + ?Sized>(
    store: &mut S,
    relocations: &[Relocation],
) -> Result<usize, TangoError> {
    let mut moved = 0;
    for relocation in relocations {
        debug!("Moving {} cards of note {} to {}", relocation.card_ids.len(), relocation.note_id, relocation.deck);
        store.move_cards(&relocation.card_ids, &relocation.deck)?;
        moved += relocation.card_ids.len();
    }
    Ok(moved)
}

/// Sweep the whole collection against `rule`.
pub fn sort_store<S: NoteStore + ?Sized>(store: &mut S, rule: &DeckRoutingRule) -> Result<usize, TangoError> {
    let note_ids = store.all_note_ids()?;
    let placements = store.note_placements(&note_ids)?;
    let relocations = sort_collection(&placements, rule);
    let moved = apply_relocations(store, &relocations)?;
    info!("Sorted {} notes, moved {} cards", relocations.len(), moved);
    Ok(moved)
}

/// Route one freshly added note.
pub fn route_new_note<S: NoteStore + ?Sized>(
    store: &mut S,
    note_id: u64,
    config: &DeckSortConfig,
) -> Result<usize, TangoError> {
    let relocations: Vec<Relocation> = store
        .note_placements(&[note_id])?
        .iter()
        .filter_map(|note| on_note_added(note, config))
        .collect();
    apply_relocations(store, &relocations)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::anki::MemoryStore;

    struct Scripted {
        calls: RefCell<Vec<String>>,
    }

    impl Enricher for Scripted {
        fn enrich(&self, headword: &str) -> Result<Option<EnrichmentResult>, TangoError> {
            self.calls.borrow_mut().push(headword.to_string());
            match headword {
                "猫" => Ok(Some(EnrichmentResult {
                    reading: "ねこ".to_string(),
                    level: "N5".to_string(),
                    ..Default::default()
                })),
                "壊" => Err(TangoError::Fetch("timed out".to_string())),
                _ => Ok(None),
            }
        }
    }

    fn rows() -> Vec<RawFieldMapping> {
        vec![
            RawFieldMapping::new("ねこ", "猫", "cat", ""),
            RawFieldMapping::new("", "", "orphan", ""),
            RawFieldMapping::new("ねこ", "猫", "cat again", ""),
            RawFieldMapping::new("", "壊", "broken", ""),
            RawFieldMapping::new("いぬ", "犬", "dog", ""),
        ]
    }

    #[test]
    fn pass_reports_each_row_once() {
        let pipeline = ImportPipeline::new(Box::new(Scripted { calls: RefCell::new(Vec::new()) }));
        let existing = HashSet::from(["犬".to_string()]);
        let outcomes: Vec<RowOutcome> = pipeline.pass(rows(), &existing).collect();

        assert_eq!(outcomes.len(), 4);
        match &outcomes[0] {
            RowOutcome::Emitted { record, enrichment } => {
                assert_eq!(record.primary_key(), "猫");
                assert_eq!(record.meaning, "cat");
                assert!(record.tags.contains("JLPT_N5"));
                assert_eq!(*enrichment, EnrichmentStatus::Enriched);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(outcomes[1], RowOutcome::Duplicate("猫".to_string()));
        assert!(matches!(
            &outcomes[2],
            RowOutcome::Emitted { enrichment: EnrichmentStatus::Failed(_), record } if record.meaning == "broken"
        ));
        assert_eq!(outcomes[3], RowOutcome::Duplicate("犬".to_string()));
    }

    #[test]
    fn duplicates_are_not_looked_up() {
        let scripted = Scripted { calls: RefCell::new(Vec::new()) };
        let existing = HashSet::from(["犬".to_string()]);
        {
            let pipeline = ImportPipeline::new(Box::new(&scripted));
            assert_eq!(pipeline.pass(rows(), &existing).count(), 4);
        }
        assert_eq!(*scripted.calls.borrow(), vec!["猫", "壊"]);
    }

    #[test]
    fn stopping_early_leaves_the_rest_untouched() {
        let scripted = Scripted { calls: RefCell::new(Vec::new()) };
        let existing = HashSet::new();
        {
            let pipeline = ImportPipeline::new(Box::new(&scripted));
            let first = pipeline.pass(rows(), &existing).next();
            assert!(first.is_some());
        }
        assert_eq!(scripted.calls.borrow().len(), 1);
    }

    /// Refuses the first `add_note`, then behaves like the wrapped store.
    struct RefusesFirstWrite {
        inner: MemoryStore,
        refused: bool,
    }

    impl NoteStore for RefusesFirstWrite {
        fn field_names(&self, note_type: &str) -> Result<Option<Vec<String>>, TangoError> {
            self.inner.field_names(note_type)
        }

        fn existing_keys(&self, note_type: &str, key_field: &str) -> Result<HashSet<String>, TangoError> {
            self.inner.existing_keys(note_type, key_field)
        }

        fn add_note(&mut self, note: &NewNote) -> Result<u64, TangoError> {
            if !self.refused {
                self.refused = true;
                return Err(TangoError::AnkiConnect("collection is not available".to_string()));
            }
            self.inner.add_note(note)
        }

        fn notes(&self, note_ids: &[u64]) -> Result<Vec<crate::anki::StoredNote>, TangoError> {
            self.inner.notes(note_ids)
        }

        fn update_note(
            &mut self,
            note_id: u64,
            fields: &HashMap<String, String>,
            tags: &std::collections::BTreeSet<String>,
        ) -> Result<(), TangoError> {
            self.inner.update_note(note_id, fields, tags)
        }

        fn all_note_ids(&self) -> Result<Vec<u64>, TangoError> {
            self.inner.all_note_ids()
        }

        fn note_placements(&self, note_ids: &[u64]) -> Result<Vec<crate::routing::NotePlacement>, TangoError> {
            self.inner.note_placements(note_ids)
        }

        fn move_cards(&mut self, card_ids: &[u64], deck: &str) -> Result<(), TangoError> {
            self.inner.move_cards(card_ids, deck)
        }
    }

    #[test]
    fn refused_write_does_not_mark_the_key_as_seen() {
        let mut store = RefusesFirstWrite {
            inner: MemoryStore::new().with_note_type(crate::anki::VOCAB_NOTE_TYPE, &crate::anki::VOCAB_FIELDS),
            refused: false,
        };
        let rows = [["ねこ", "猫", "cat"], ["ねこ", "猫", "cat again"]]
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        let document = SourceDocument {
            path: "cats.csv".into(),
            tables: vec![crate::sources::Table::new(crate::sources::ColumnMap::markdown(), rows)],
        };

        let summary = ImportPipeline::without_enrichment()
            .import_into(&mut store, &ImportSettings::default(), &[document], None)
            .unwrap();

        assert_eq!(summary.write_failed, 1);
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped_duplicate, 0);
        assert_eq!(store.inner.note_count(), 1);
    }

    #[test]
    fn missing_note_type_is_rejected_before_writing() {
        let mut store = MemoryStore::new();
        let document = SourceDocument {
            path: "cats.csv".into(),
            tables: Vec::new(),
        };
        let err = ImportPipeline::without_enrichment()
            .import_into(&mut store, &ImportSettings::default(), &[document], None)
            .unwrap_err();
        assert!(matches!(err, TangoError::Configuration(_)));
        assert_eq!(store.note_count(), 0);
    }
}
