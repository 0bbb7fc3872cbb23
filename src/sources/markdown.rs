use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use tracing::{
    debug,
    warn,
};
use walkdir::WalkDir;

use super::{
    columns::ColumnMap,
    SourceDocument,
    Table,
};
use crate::core::TangoError;

pub const VOCABULARY_HEADING: &str = "Vocabulary";

/// Every vocabulary table found under a folder, plus the files that could not be read.
#[derive(Debug, Default)]
pub struct MarkdownFolder {
    pub documents: Vec<SourceDocument>,
    pub failures: Vec<TangoError>,
}

pub fn parse_markdown_folder(root: &Path) -> Result<MarkdownFolder, TangoError> {
    if !root.is_dir() {
        return Err(TangoError::Configuration(format!("Folder not found: {}", root.display())));
    }

    let mut folder = MarkdownFolder::default();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                folder.failures.push(TangoError::parse(path, e.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }

        match parse_markdown_file(entry.path()) {
            Ok(document) => {
                debug!(
                    "{}: {} vocabulary table(s)",
                    entry.path().display(),
                    document.tables.len()
                );
                folder.documents.push(document);
            }
            Err(e) => {
                warn!("Skipping unreadable markdown file: {}", e);
                folder.failures.push(e);
            }
        }
    }

    Ok(folder)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

pub fn parse_markdown_file(path: &Path) -> Result<SourceDocument, TangoError> {
    let text = fs::read_to_string(path).map_err(|e| TangoError::parse(path, e.to_string()))?;
    Ok(parse_markdown(PathBuf::from(path), &text))
}

pub fn parse_markdown(path: PathBuf, text: &str) -> SourceDocument {
    let lines: Vec<&str> = text.lines().collect();
    let mut tables = Vec::new();
    let mut in_section = false;
    let mut i = 0;

    while i < lines.len() {
        if let Some(heading) = heading_text(lines[i]) {
            in_section = heading == VOCABULARY_HEADING;
            i += 1;
            continue;
        }
        if in_section && is_vocabulary_header(lines[i]) {
            let (table, consumed) = read_table(&lines[i..]);
            tables.push(table);
            i += consumed;
            continue;
        }
        i += 1;
    }

    SourceDocument { path, tables }
}

/// Text of an ATX heading ("## Vocabulary" -> "Vocabulary").
fn heading_text(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim().trim_end_matches('#').trim_end())
}

fn split_cells(line: &str) -> Vec<String> {
    line.trim().trim_matches('|').split('|').map(|cell| cell.trim().to_string()).collect()
}

fn is_vocabulary_header(line: &str) -> bool {
    if !line.trim_start().starts_with('|') {
        return false;
    }
    let cells = split_cells(line);
    cells.len() >= 3
        && cells[0].eq_ignore_ascii_case("word")
        && cells[1].eq_ignore_ascii_case("kanji")
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains('-') && trimmed.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// Reads from the header line; returns the table and the number of lines consumed.
fn read_table(lines: &[&str]) -> (Table, usize) {
    let mut consumed = 1;
    let mut rows = Vec::new();

    for line in &lines[1..] {
        let line = line.trim_end();
        if !line.trim_start().starts_with('|') {
            break;
        }
        consumed += 1;
        if is_separator(line) {
            continue;
        }
        let cells = split_cells(line);
        if cells.len() < 3 {
            continue;
        }
        rows.push(cells);
    }

    (Table::new(ColumnMap::markdown(), rows), consumed)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::RawFieldMapping;

    const LESSON: &str = "\
# Lesson 4

Some notes about grammar.

## Vocabulary

| Word | Kanji | Meaning | Type |
| --- | --- | --- | --- |
| しょうがいしゃ | 障害者 | Disabled person | |
| たべる | 食べる | to eat | verb |
|  |  | nothing here | |
| すごい | | amazing | i-adj |
| short | row |

| Word | Kanji | Meaning |
|------|-------|---------|
| ねこ | 猫 | cat |

## Grammar

| Word | Kanji | Meaning | Type |
| --- | --- | --- | --- |
| ignored | 無視 | outside the section | |

### vocabulary

| Word | Kanji | Meaning | Type |
| --- | --- | --- | --- |
| ignored | 小文字 | heading is case sensitive | |
";

    #[test]
    fn reads_tables_under_vocabulary_heading_only() {
        let document = parse_markdown(PathBuf::from("lesson.md"), LESSON);
        let records: Vec<RawFieldMapping> = document.records().collect();

        assert_eq!(
            records,
            vec![
                RawFieldMapping::new("しょうがいしゃ", "障害者", "Disabled person", ""),
                RawFieldMapping::new("たべる", "食べる", "to eat", "verb"),
                RawFieldMapping::new("すごい", "", "amazing", "i-adj"),
                RawFieldMapping::new("ねこ", "猫", "cat", ""),
            ]
        );
        assert_eq!(records[0].primary_key(), Some("障害者"));
        assert_eq!(records[2].primary_key(), Some("すごい"));
    }

    #[test]
    fn records_are_restartable() {
        let document = parse_markdown(PathBuf::from("lesson.md"), LESSON);
        let first: Vec<_> = document.records().collect();
        let second: Vec<_> = document.records().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn heading_detection() {
        assert_eq!(heading_text("## Vocabulary"), Some("Vocabulary"));
        assert_eq!(heading_text("# Vocabulary #"), Some("Vocabulary"));
        assert_eq!(heading_text("#hashtag"), None);
        assert_eq!(heading_text("plain"), None);
    }

    #[test]
    fn walks_folders_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("week1").join("day2");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a.md"), LESSON).unwrap();
        fs::write(nested.join("b.MD"), "## Vocabulary\n| Word | Kanji | Meaning | Type |\n|--|--|--|--|\n| いぬ | 犬 | dog | n |\n").unwrap();
        fs::write(nested.join("notes.txt"), "## Vocabulary\n| Word | Kanji | Meaning |\n| x | y | z |").unwrap();
        fs::write(nested.join("bad.md"), [0xffu8, 0xfe, 0x00]).unwrap();

        let folder = parse_markdown_folder(dir.path()).unwrap();
        let keys: Vec<String> = folder
            .documents
            .iter()
            .flat_map(|d| d.records())
            .filter_map(|r| r.primary_key().map(str::to_string))
            .collect();

        assert_eq!(keys, vec!["障害者", "食べる", "すごい", "猫", "犬"]);
        assert_eq!(folder.failures.len(), 1);
        assert!(matches!(folder.failures[0], TangoError::Parse { .. }));
    }

    #[test]
    fn missing_folder_is_a_configuration_error() {
        let err = parse_markdown_folder(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, TangoError::Configuration(_)));
    }
}
