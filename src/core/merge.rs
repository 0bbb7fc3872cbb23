use super::models::{
    EnrichmentResult,
    RawFieldMapping,
    VocabularyRecord,
};

pub const MAX_EXAMPLES: usize = 2;

/// Build the record for one source row.
///
/// Identity always comes from `raw`. Reading, part of speech and meaning are taken from
/// the lookup when it supplies a value and from `raw` otherwise; examples and level tags
/// only ever come from the lookup. Returns `None` for rows without a headword.
pub fn merge(raw: &RawFieldMapping, enrichment: Option<&EnrichmentResult>) -> Option<VocabularyRecord> {
    let primary_key = raw.primary_key()?.to_string();
    let mut record = VocabularyRecord::new(primary_key);

    record.reading = prefer(enrichment.map(|e| e.reading.as_str()), &raw.word);
    record.part_of_speech = prefer(enrichment.map(|e| e.part_of_speech.as_str()), &raw.kind);
    record.meaning = prefer(enrichment.map(|e| e.meaning.as_str()), &raw.meaning);

    if let Some(enrichment) = enrichment {
        record.examples = enrichment.examples.iter().take(MAX_EXAMPLES).cloned().collect();
        if let Some(tag) = enrichment.level_tag() {
            record.tags.insert(tag);
        }
    }

    Some(record)
}

fn prefer(enriched: Option<&str>, raw: &str) -> String {
    match enriched.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::models::ExamplePair;

    fn lookup() -> EnrichmentResult {
        EnrichmentResult {
            reading: "にんじゃ".to_string(),
            part_of_speech: "n".to_string(),
            meaning: "ninja, shinobi".to_string(),
            examples: vec![
                ExamplePair {
                    text: "忍者が来た。".to_string(),
                    annotated_text: "<ruby>忍者<rt>にんじゃ</rt></ruby>が<ruby>来<rt>き</rt></ruby>た。"
                        .to_string(),
                    translation: "The ninja came.".to_string(),
                },
                ExamplePair::default(),
                ExamplePair::default(),
            ],
            level: "N1".to_string(),
        }
    }

    #[test]
    fn raw_only_merge_has_no_examples_or_tags() {
        let raw = RawFieldMapping::new("しょうがいしゃ", "障害者", "Disabled person", "");
        let record = merge(&raw, None).unwrap();

        assert_eq!(record.primary_key(), "障害者");
        assert_eq!(record.reading, "しょうがいしゃ");
        assert_eq!(record.meaning, "Disabled person");
        assert_eq!(record.part_of_speech, "");
        assert!(record.examples.is_empty());
        assert!(record.tags.is_empty());
    }

    #[test]
    fn lookup_owns_linguistic_fields() {
        let raw = RawFieldMapping::new("", "忍者", "ninja", "noun");
        let record = merge(&raw, Some(&lookup())).unwrap();

        assert_eq!(record.primary_key(), "忍者");
        assert_eq!(record.reading, "にんじゃ");
        assert_eq!(record.part_of_speech, "n");
        assert_eq!(record.meaning, "ninja, shinobi");
        assert_eq!(record.examples.len(), MAX_EXAMPLES);
        assert!(record.tags.contains("JLPT_N1"));
    }

    #[test]
    fn empty_lookup_fields_fall_back_to_raw() {
        let raw = RawFieldMapping::new("ねこ", "猫", "cat", "n");
        let sparse = EnrichmentResult { level: "Unclassified".to_string(), ..Default::default() };
        let record = merge(&raw, Some(&sparse)).unwrap();

        assert_eq!(record.reading, "ねこ");
        assert_eq!(record.meaning, "cat");
        assert_eq!(record.part_of_speech, "n");
        assert!(record.tags.is_empty());
    }

    #[test]
    fn merge_is_deterministic() {
        let raw = RawFieldMapping::new("にんじゃ", "忍者", "ninja", "");
        let enrichment = lookup();
        assert_eq!(merge(&raw, Some(&enrichment)), merge(&raw, Some(&enrichment)));
        assert_eq!(merge(&raw, None), merge(&raw, None));
    }

    #[test]
    fn rows_without_headword_are_rejected() {
        let raw = RawFieldMapping::new("", "", "orphan meaning", "");
        assert!(merge(&raw, Some(&lookup())).is_none());
    }
}
