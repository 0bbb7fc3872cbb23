use std::sync::OnceLock;

use regex::Regex;
use wana_kana::IsJapaneseChar;

use crate::core::utils::StripHtml;

const BLANK: &str = "____";

fn blank_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<span[^>]*>____</span>").unwrap())
}

// 日本（にほん）の学生（がくせい）は____を着（き）ています。
fn fill_blank(content: &str, answer: &str) -> String {
    blank_span().replace_all(content, answer).replace(BLANK, answer)
}

/// Sentence without reading annotations: 学生（がくせい） -> 学生
pub fn plain_text(content: &str, answer: &str) -> String {
    static READING: OnceLock<Regex> = OnceLock::new();
    let re = READING.get_or_init(|| Regex::new(r"（[^）]+）").unwrap());

    re.replace_all(&fill_blank(content, answer), "").strip_html()
}

/// Sentence with `<ruby>` furigana: 学生（がくせい） -> <ruby>学生<rt>がくせい</rt></ruby>
///
/// The annotated base is the kanji/katakana run directly before the reading, so
/// particles never end up inside the ruby element.
pub fn annotated_text(content: &str, answer: &str) -> String {
    static SPAN: OnceLock<Regex> = OnceLock::new();
    let span = SPAN.get_or_init(|| Regex::new(r"(?is)<span[^>]*>.*?</span>").unwrap());

    let filled = fill_blank(content, answer);
    let chars: Vec<char> = filled.chars().collect();
    let mut out = String::with_capacity(filled.len() * 2);
    let mut base_start = out.len();
    let mut in_base = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '（' && in_base {
            if let Some(len) = chars[i + 1..].iter().position(|&ch| ch == '）') {
                let reading: String = chars[i + 1..i + 1 + len].iter().collect();
                let base = out.split_off(base_start);
                out.push_str(&format!("<ruby>{}<rt>{}</rt></ruby>", base, reading));
                in_base = false;
                base_start = out.len();
                i += len + 2;
                continue;
            }
        }

        let is_base_char = c.is_kanji() || c.is_katakana();
        if is_base_char && !in_base {
            base_start = out.len();
        }
        in_base = is_base_char;
        out.push(c);
        i += 1;
    }

    span.replace_all(&out, "").trim().to_string()
}
