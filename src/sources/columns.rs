use crate::core::{
    utils::normalize_header,
    RawFieldMapping,
    TangoError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Word,
    Kanji,
    Meaning,
    Type,
}

/// Accepted header names per slot, in slot declaration order. When a header appears
/// under more than one slot it binds to the first slot listing it, except for the
/// literal names "kanji" and "word", which always bind to their own slot.
pub const SLOT_ALIASES: &[(Slot, &[&str])] = &[
    (
        Slot::Word,
        &["word", "kana", "reading", "readings", "furigana", "hiragana", "phonetic", "vocabulary"],
    ),
    (Slot::Kanji, &["kanji", "vocabulary", "vocab", "term", "expression", "japanese"]),
    (Slot::Meaning, &["meaning", "definition", "english", "translation", "gloss", "def", "mean"]),
    (Slot::Type, &["type", "pos", "part of speech", "part_of_speech", "word class", "category"]),
];

pub fn slot_for_header(header: &str) -> Option<Slot> {
    let name = normalize_header(header);
    match name.as_str() {
        "kanji" => return Some(Slot::Kanji),
        "word" => return Some(Slot::Word),
        _ => {}
    }
    SLOT_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&name.as_str()))
        .map(|(slot, _)| *slot)
}

/// Word-slot aliases that only ever name a phonetic column.
fn is_reading_alias(name: &str) -> bool {
    let listed = |slot: Slot| {
        SLOT_ALIASES
            .iter()
            .any(|(s, aliases)| *s == slot && aliases.contains(&name))
    };
    name != "word" && listed(Slot::Word) && !listed(Slot::Kanji)
}

/// Column index bound to each slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub word: Option<usize>,
    pub kanji: Option<usize>,
    pub meaning: Option<usize>,
    pub kind: Option<usize>,
}

impl ColumnMap {
    /// Fixed `Word | Kanji | Meaning | Type` layout of markdown vocabulary tables.
    pub fn markdown() -> Self {
        ColumnMap { word: Some(0), kanji: Some(1), meaning: Some(2), kind: Some(3) }
    }

    /// Bind columns by header name, or by position when no header is recognized.
    pub fn detect(headers: &[String]) -> Result<Self, TangoError> {
        let mut map = ColumnMap::default();

        for (index, header) in headers.iter().enumerate() {
            if let Some(slot) = slot_for_header(header) {
                let target = map.slot_mut(slot);
                if target.is_none() {
                    *target = Some(index);
                }
            }
        }

        if map == ColumnMap::default() {
            return Self::positional(headers.len());
        }

        // A literal "word" beside a reading column is the headword
        if map.kanji.is_none() {
            let word_is_literal = map.word.is_some_and(|i| normalize_header(&headers[i]) == "word");
            let reading = headers.iter().position(|h| is_reading_alias(&normalize_header(h)));
            if let (true, Some(reading)) = (word_is_literal, reading) {
                map.kanji = map.word;
                map.word = Some(reading);
            }
        }

        if map.word.is_none() && map.kanji.is_none() {
            if map.is_bound(0) {
                return Err(TangoError::Configuration(
                    "No word or kanji column found in header".to_string(),
                ));
            }
            map.kanji = Some(0);
        }

        Ok(map)
    }

    fn positional(column_count: usize) -> Result<Self, TangoError> {
        if column_count < 2 {
            return Err(TangoError::Configuration(format!(
                "No recognized columns and only {} column(s) present",
                column_count
            )));
        }
        Ok(ColumnMap {
            kanji: Some(0),
            word: Some(1),
            meaning: (column_count > 2).then_some(2),
            kind: None,
        })
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<usize> {
        match slot {
            Slot::Word => &mut self.word,
            Slot::Kanji => &mut self.kanji,
            Slot::Meaning => &mut self.meaning,
            Slot::Type => &mut self.kind,
        }
    }

    fn is_bound(&self, index: usize) -> bool {
        [self.word, self.kanji, self.meaning, self.kind].contains(&Some(index))
    }

    pub fn extract(&self, row: &[String]) -> RawFieldMapping {
        let cell = |index: Option<usize>| {
            index.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
        };
        RawFieldMapping::new(
            cell(self.word),
            cell(self.kanji),
            cell(self.meaning),
            cell(self.kind),
        )
    }
}
