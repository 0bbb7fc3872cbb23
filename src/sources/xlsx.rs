use std::{
    collections::BTreeMap,
    fs::File,
    io::{
        Read,
        Seek,
    },
    path::Path,
    sync::OnceLock,
};

use regex::Regex;
use zip::ZipArchive;

use crate::core::TangoError;

const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const FIRST_SHEET: &str = "xl/worksheets/sheet1.xml";
/// Column XFD, the widest sheet Excel writes.
const MAX_COLUMNS: usize = 16_384;

struct Patterns {
    row: Regex,
    cell: Regex,
    value: Regex,
    text: Regex,
    shared_item: Regex,
    phonetic_run: Regex,
    attr_ref: Regex,
    attr_type: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        row: Regex::new(r"(?s)<row\b([^>]*?)(?:/>|>(.*?)</row>)").unwrap(),
        cell: Regex::new(r"(?s)<c\b([^>]*?)(?:/>|>(.*?)</c>)").unwrap(),
        value: Regex::new(r"(?s)<v>(.*?)</v>").unwrap(),
        text: Regex::new(r"(?s)<t(?:\s[^>]*)?>(.*?)</t>").unwrap(),
        shared_item: Regex::new(r"(?s)<si>(.*?)</si>").unwrap(),
        phonetic_run: Regex::new(r"(?s)<rPh\b.*?</rPh>").unwrap(),
        attr_ref: Regex::new(r#"\br="([A-Za-z]*)(\d*)""#).unwrap(),
        attr_type: Regex::new(r#"\bt="([^"]*)""#).unwrap(),
    })
}

/// Read the first worksheet of a workbook as rows of trimmed cell text.
pub fn read_first_sheet(path: &Path) -> Result<Vec<Vec<String>>, TangoError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| TangoError::parse(path, format!("not a valid workbook: {}", e)))?;

    let shared = match read_entry(&mut archive, SHARED_STRINGS) {
        Some(xml) => parse_shared_strings(&xml?),
        None => Vec::new(),
    };

    let sheet_name = first_sheet_name(&archive)
        .ok_or_else(|| TangoError::parse(path, "workbook has no worksheets"))?;
    let sheet = read_entry(&mut archive, &sheet_name)
        .ok_or_else(|| TangoError::parse(path, "workbook has no worksheets"))??;

    parse_sheet(path, &sheet, &shared)
}

fn first_sheet_name<R: Read + Seek>(archive: &ZipArchive<R>) -> Option<String> {
    let mut sheets: Vec<&str> = archive
        .file_names()
        .filter(|name| name.starts_with("xl/worksheets/") && name.ends_with(".xml"))
        .collect();
    if sheets.contains(&FIRST_SHEET) {
        return Some(FIRST_SHEET.to_string());
    }
    sheets.sort();
    sheets.first().map(|name| name.to_string())
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Option<Result<String, TangoError>> {
    let mut entry = archive.by_name(name).ok()?;
    let mut xml = String::new();
    Some(entry.read_to_string(&mut xml).map(|_| xml).map_err(TangoError::from))
}

pub fn parse_shared_strings(xml: &str) -> Vec<String> {
    let p = patterns();
    p.shared_item
        .captures_iter(xml)
        .map(|item| {
            // Furigana hints (<rPh>) are not part of the cell text
            let visible = p.phonetic_run.replace_all(&item[1], "");
            p.text
                .captures_iter(&visible)
                .map(|t| decode_entities(&t[1]))
                .collect::<String>()
        })
        .collect()
}

pub fn parse_sheet(path: &Path, xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>, TangoError> {
    let p = patterns();
    let mut grid: BTreeMap<usize, BTreeMap<usize, String>> = BTreeMap::new();

    for (position, row) in p.row.captures_iter(xml).enumerate() {
        let row_number = p
            .attr_ref
            .captures(&row[1])
            .and_then(|c| c[2].parse::<usize>().ok())
            .unwrap_or(position + 1);
        let cells = grid.entry(row_number).or_default();
        let Some(body) = row.get(2) else { continue };

        for (offset, cell) in p.cell.captures_iter(body.as_str()).enumerate() {
            let attrs = &cell[1];
            let column = match p.attr_ref.captures(attrs) {
                Some(c) if !c[1].is_empty() => column_index(&c[1]).ok_or_else(|| {
                    TangoError::parse(path, format!("invalid cell reference {}{}", &c[1], &c[2]))
                })?,
                _ => offset,
            };
            let kind = p.attr_type.captures(attrs).map(|c| c[1].to_string());
            let content = cell.get(2).map(|m| m.as_str()).unwrap_or("");
            cells.insert(column, cell_text(content, kind.as_deref(), shared));
        }
    }

    Ok(grid
        .into_values()
        .map(|cells| {
            let width = cells.keys().next_back().map(|last| last + 1).unwrap_or(0);
            let mut row = vec![String::new(); width];
            for (column, text) in cells {
                row[column] = text;
            }
            row
        })
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect())
}

fn cell_text(content: &str, kind: Option<&str>, shared: &[String]) -> String {
    let p = patterns();
    let text = match kind {
        Some("s") => p
            .value
            .captures(content)
            .and_then(|v| v[1].trim().parse::<usize>().ok())
            .and_then(|index| shared.get(index).cloned())
            .unwrap_or_default(),
        Some("inlineStr") => p.text.captures_iter(content).map(|t| decode_entities(&t[1])).collect(),
        _ => p.value.captures(content).map(|v| decode_entities(&v[1])).unwrap_or_default(),
    };
    text.trim().to_string()
}

/// "A" -> 0, "AB" -> 27. `None` when the reference has no column letters or lies past XFD.
pub fn column_index(letters: &str) -> Option<usize> {
    let mut n: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
        if n > MAX_COLUMNS {
            return None;
        }
    }
    n.checked_sub(1)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
