use std::collections::HashSet;

use serde::Deserialize;

use super::sentence::{
    annotated_text,
    plain_text,
};
use crate::core::{
    merge::MAX_EXAMPLES,
    utils::StripHtml,
    EnrichmentResult,
    ExamplePair,
    TangoError,
};

const NEXT_DATA_MARKER: &str = r#"__NEXT_DATA__" type="application/json">"#;
const SCRIPT_END: &str = "</script>";
const QUESTIONS_SCANNED: usize = 5;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NextData {
    props: Props,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Props {
    page_props: PageProps,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageProps {
    reviewable: Option<Reviewable>,
    included: Option<Included>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Reviewable {
    kana: Option<String>,
    meaning: Option<String>,
    jlpt_level: Option<String>,
    jmdict_data: Option<JmdictData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JmdictData {
    sense: Vec<Sense>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Sense {
    part_of_speech: Vec<String>,
    gloss: Vec<Gloss>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Gloss {
    lang: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Included {
    study_questions: Vec<StudyQuestion>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StudyQuestion {
    content: Option<String>,
    translation: Option<String>,
    answer: Option<String>,
    kanji_answer: Option<String>,
}

/// Extract the lookup fields from a vocabulary page.
///
/// `Ok(None)` when the page carries no vocabulary entry. A page without the embedded
/// data block, or with a block that is not valid JSON, is an error.
pub fn parse_vocab_page(html: &str) -> Result<Option<EnrichmentResult>, TangoError> {
    let start = html
        .find(NEXT_DATA_MARKER)
        .map(|idx| idx + NEXT_DATA_MARKER.len())
        .ok_or_else(|| TangoError::Fetch("page has no embedded vocabulary data".to_string()))?;
    let end = html[start..]
        .find(SCRIPT_END)
        .map(|idx| start + idx)
        .ok_or_else(|| TangoError::Fetch("embedded vocabulary data is truncated".to_string()))?;

    let data: NextData = serde_json::from_str(&html[start..end])
        .map_err(|e| TangoError::Fetch(format!("invalid embedded vocabulary data: {}", e)))?;

    let Some(reviewable) = data.props.page_props.reviewable else {
        return Ok(None);
    };
    let questions = data.props.page_props.included.map(|i| i.study_questions).unwrap_or_default();

    Ok(Some(EnrichmentResult {
        reading: reviewable.kana.as_deref().unwrap_or("").trim().to_string(),
        part_of_speech: part_of_speech(&reviewable),
        meaning: meaning(&reviewable),
        examples: examples(&questions),
        level: reviewable.jlpt_level.unwrap_or_default(),
    }))
}

fn senses(reviewable: &Reviewable) -> &[Sense] {
    reviewable.jmdict_data.as_ref().map(|d| d.sense.as_slice()).unwrap_or(&[])
}

fn meaning(reviewable: &Reviewable) -> String {
    let meaning = reviewable.meaning.as_deref().unwrap_or("").trim();
    if !meaning.is_empty() {
        return meaning.to_string();
    }
    senses(reviewable)
        .iter()
        .flat_map(|s| &s.gloss)
        .filter(|g| g.lang.as_deref() == Some("eng"))
        .filter_map(|g| g.text.as_deref().filter(|t| !t.is_empty()))
        .collect::<Vec<_>>()
        .join(", ")
}

// Prenominal adjectives (adj-f) are filed as plain "adj"
fn part_of_speech(reviewable: &Reviewable) -> String {
    let mut seen = HashSet::new();
    senses(reviewable)
        .iter()
        .flat_map(|s| &s.part_of_speech)
        .filter(|p| !p.is_empty() && seen.insert(p.as_str()))
        .map(|p| if p == "adj-f" { "adj" } else { p.as_str() })
        .collect::<Vec<_>>()
        .join(", ")
}

fn examples(questions: &[StudyQuestion]) -> Vec<ExamplePair> {
    questions
        .iter()
        .take(QUESTIONS_SCANNED)
        .filter_map(|q| {
            let content = q.content.as_deref().filter(|c| !c.is_empty())?;
            let translation = q.translation.as_deref().filter(|t| !t.is_empty())?;
            let answer = q
                .kanji_answer
                .as_deref()
                .filter(|k| !k.is_empty())
                .or(q.answer.as_deref())
                .unwrap_or("");

            let text = plain_text(content, answer);
            let translation = translation.strip_html();
            if text.is_empty() || translation.is_empty() {
                return None;
            }
            Some(ExamplePair { annotated_text: annotated_text(content, answer), text, translation })
        })
        .take(MAX_EXAMPLES)
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn page(json: &str) -> String {
        format!(
            "<html><head><script id=\"__NEXT_DATA__\" type=\"application/json\">{}</script></head></html>",
            json
        )
    }

    const NINJA: &str = r#"{"props":{"pageProps":{
        "reviewable":{"title":"忍者","kana":"にんじゃ","meaning":"","jlpt_level":"N1",
            "jmdict_data":{"sense":[
                {"partOfSpeech":["n"],"gloss":[{"lang":"eng","text":"ninja"},{"lang":"ger","text":"Ninja"}]},
                {"partOfSpeech":["n","adj-f"],"gloss":[{"lang":"eng","text":"shinobi"}]}
            ]}},
        "included":{"studyQuestions":[
            {"content":"","translation":"skipped"},
            {"content":"____が来（き）た。","translation":"The <strong>ninja</strong> came.","answer":"にんじゃ","kanji_answer":"忍者"},
            {"content":"____だ！","translation":"It's a ninja!","answer":"にんじゃ","kanji_answer":null},
            {"content":"三つ目（みつめ）","translation":"third"}
        ]}
    }}}"#;

    #[test]
    fn extracts_every_field() {
        let result = parse_vocab_page(&page(NINJA)).unwrap().unwrap();

        assert_eq!(result.reading, "にんじゃ");
        assert_eq!(result.meaning, "ninja, shinobi");
        assert_eq!(result.part_of_speech, "n, adj");
        assert_eq!(result.level, "N1");
        assert_eq!(result.level_tag().as_deref(), Some("JLPT_N1"));
        assert_eq!(
            result.examples,
            vec![
                ExamplePair {
                    text: "忍者が来た。".to_string(),
                    annotated_text: "忍者が<ruby>来<rt>き</rt></ruby>た。".to_string(),
                    translation: "The ninja came.".to_string(),
                },
                ExamplePair {
                    text: "にんじゃだ！".to_string(),
                    annotated_text: "にんじゃだ！".to_string(),
                    translation: "It's a ninja!".to_string(),
                },
            ]
        );
    }

    #[test]
    fn fields_are_independent() {
        let json = r#"{"props":{"pageProps":{"reviewable":{"meaning":"cat"}}}}"#;
        let result = parse_vocab_page(&page(json)).unwrap().unwrap();
        assert_eq!(result.meaning, "cat");
        assert_eq!(result.reading, "");
        assert_eq!(result.part_of_speech, "");
        assert!(result.examples.is_empty());
        assert_eq!(result.level_tag(), None);
    }

    #[test]
    fn missing_entry_is_not_found() {
        let json = r#"{"props":{"pageProps":{"reviewable":null}}}"#;
        assert_eq!(parse_vocab_page(&page(json)).unwrap(), None);
    }

    #[test]
    fn malformed_pages_are_errors() {
        assert!(matches!(parse_vocab_page("<html></html>"), Err(TangoError::Fetch(_))));
        assert!(matches!(parse_vocab_page(&page("{not json")), Err(TangoError::Fetch(_))));
    }
}
