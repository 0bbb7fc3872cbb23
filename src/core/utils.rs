use std::sync::OnceLock;

use regex::Regex;

pub trait StripHtml {
    fn strip_html(&self) -> String;
}

// <strong>猫</strong>&nbsp;です -> 猫 です
impl StripHtml for str {
    fn strip_html(&self) -> String {
        static TAG: OnceLock<Regex> = OnceLock::new();
        let re = TAG.get_or_init(|| Regex::new(r"<[^>]+>").unwrap());

        re.replace_all(self, "")
            .replace("&nbsp;", " ")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&")
            .trim()
            .to_string()
    }
}

impl StripHtml for String {
    fn strip_html(&self) -> String {
        self.as_str().strip_html()
    }
}

/// Header cells are matched case-insensitively after trimming.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}
