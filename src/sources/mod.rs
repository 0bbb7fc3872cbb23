//! Turning exported files into [`RawFieldMapping`] rows.
//!
//! Spreadsheet exports (CSV, XLSX) go through header detection in [`columns`];
//! markdown notes use a fixed table layout and are collected from a whole folder.

use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use tracing::info;

use crate::core::{
    RawFieldMapping,
    TangoError,
};

pub mod columns;
pub mod csv;
pub mod markdown;
pub mod xlsx;

pub use columns::ColumnMap;
pub use markdown::{
    parse_markdown_folder,
    MarkdownFolder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
    Markdown,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, TangoError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
        match ext.as_str() {
            "xlsx" => Ok(SourceFormat::Xlsx),
            "md" => Ok(SourceFormat::Markdown),
            "xls" => Err(TangoError::parse(path, "legacy .xls workbooks are not supported")),
            _ => Ok(SourceFormat::Csv),
        }
    }
}

/// Rows of one table with their column bindings. Records are produced on demand,
/// so iterating twice yields the same sequence.
#[derive(Debug, Clone)]
pub struct Table {
    columns: ColumnMap,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: ColumnMap, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// First row is the header.
    pub fn with_header(mut rows: Vec<Vec<String>>) -> Result<Self, TangoError> {
        if rows.is_empty() {
            return Ok(Self::new(ColumnMap::default(), rows));
        }
        let header = rows.remove(0);
        let columns = ColumnMap::detect(&header)?;
        Ok(Self::new(columns, rows))
    }

    /// Candidate rows only; rows without word and kanji are dropped.
    pub fn records(&self) -> impl Iterator<Item = RawFieldMapping> + '_ {
        self.rows.iter().map(|row| self.columns.extract(row)).filter(RawFieldMapping::is_candidate)
    }
}

#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub tables: Vec<Table>,
}

impl SourceDocument {
    pub fn records(&self) -> impl Iterator<Item = RawFieldMapping> + '_ {
        self.tables.iter().flat_map(Table::records)
    }
}

/// Parse one spreadsheet export (or a single markdown file).
pub fn parse_file(path: &Path) -> Result<SourceDocument, TangoError> {
    let document = match SourceFormat::from_path(path)? {
        SourceFormat::Markdown => markdown::parse_markdown_file(path)?,
        SourceFormat::Xlsx => {
            let rows = xlsx::read_first_sheet(path)?;
            SourceDocument { path: path.to_path_buf(), tables: vec![Table::with_header(rows)?] }
        }
        SourceFormat::Csv => {
            let text = fs::read_to_string(path).map_err(|e| TangoError::parse(path, e.to_string()))?;
            let rows = csv::parse_rows(&text);
            SourceDocument { path: path.to_path_buf(), tables: vec![Table::with_header(rows)?] }
        }
    };

    info!("Parsed {} candidate rows from {}", document.records().count(), path.display());
    Ok(document)
}
