//! Paper table presentation.
//!
//! Builds the grid shown on the site: one row per paper, one column per
//! header. A few columns, matched by exact header text, are rendered
//! specially (hidden key, linked title, BibTeX download, abstract popup).

use crate::dataset::{Dataset, Row};
use crate::error::{PaperlensError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fallback base name for per-row BibTeX downloads
pub const DEFAULT_BIB_NAME: &str = "citation";

const BIBTEX_URL_PATTERN: &str = r#"(?i)url\s*=\s*[{"]([^}"]+)[}"]"#;

/// Header names that get special rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TableColumns {
    pub key: String,
    pub title: String,
    pub bibtex: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

impl Default for TableColumns {
    fn default() -> Self {
        Self {
            key: "KEY".to_string(),
            title: "TITLE".to_string(),
            bibtex: "BIBTEX".to_string(),
            abstract_text: "ABSTRACT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Key,
    Title,
    Bibtex,
    Abstract,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub title: String,
    pub role: ColumnRole,
    pub visible: bool,
    pub searchable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<&'static str>,
}

/// A rendered table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cell {
    Text { text: String },
    Link { text: String, href: String },
    Download { label: &'static str, file_name: String },
    AbstractTrigger { label: &'static str },
    Empty,
}

impl Cell {
    fn search_text(&self) -> &str {
        match self {
            Cell::Text { text } | Cell::Link { text, .. } => text,
            _ => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// Position in the dataset; per-row actions are addressed by it
    pub index: usize,
    pub id: String,
    pub cells: Vec<Cell>,
}

/// Contents of the abstract dialog for one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbstractPopup {
    pub title: String,
    #[serde(rename = "abstract")]
    pub text: String,
}

/// A per-row `.bib` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibtexFile {
    pub file_name: String,
    pub content: String,
}

/// One page of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePage<'a> {
    pub columns: &'a [Column],
    pub rows: Vec<&'a TableRow>,
    pub page: usize,
    pub page_length: usize,
    pub page_count: usize,
    pub total_rows: usize,
    pub filtered_rows: usize,
}

/// The fully rendered table plus per-row side data (abstracts, BibTeX files).
#[derive(Debug, Clone, Default)]
pub struct TableView {
    columns: Vec<Column>,
    rows: Vec<TableRow>,
    abstracts: Vec<Option<AbstractPopup>>,
    bibtex: Vec<Option<BibtexFile>>,
}

impl TableView {
    pub fn build(dataset: &Dataset, names: &TableColumns, id_column: &str) -> Result<Self> {
        let url_re = Regex::new(BIBTEX_URL_PATTERN)
            .map_err(|e| PaperlensError::Config(format!("Invalid URL pattern: {}", e)))?;

        let columns: Vec<Column> = dataset
            .headers()
            .iter()
            .map(|h| {
                let role = if *h == names.key {
                    ColumnRole::Key
                } else if *h == names.title {
                    ColumnRole::Title
                } else if *h == names.bibtex {
                    ColumnRole::Bibtex
                } else if *h == names.abstract_text {
                    ColumnRole::Abstract
                } else {
                    ColumnRole::Plain
                };
                Column {
                    title: h.clone(),
                    role,
                    visible: role != ColumnRole::Key,
                    searchable: role != ColumnRole::Key,
                    width: (role == ColumnRole::Title).then_some("30%"),
                }
            })
            .collect();

        let mut view = Self {
            columns,
            ..Default::default()
        };

        for (index, row) in dataset.rows().iter().enumerate() {
            let id = row.cell(id_column).trim().to_string();
            let cells = view
                .columns
                .iter()
                .map(|c| render_cell(c.role, &c.title, row, names, &url_re))
                .collect();

            view.abstracts
                .push(row.field(&names.abstract_text).map(|text| AbstractPopup {
                    title: row.cell(&names.title).to_string(),
                    text: text.to_string(),
                }));
            view.bibtex.push(
                row.get(&names.bibtex)
                    .filter(|b| !b.is_empty())
                    .map(|content| BibtexFile {
                        file_name: bib_file_name(row, &names.key),
                        content: content.to_string(),
                    }),
            );

            view.rows.push(TableRow { index, id, cells });
        }

        debug!(rows = view.rows.len(), columns = view.columns.len(), "Built table");
        Ok(view)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Abstract dialog contents for the row at `index`, if it has an abstract.
    pub fn abstract_for(&self, index: usize) -> Option<&AbstractPopup> {
        self.abstracts.get(index).and_then(Option::as_ref)
    }

    /// BibTeX download for the row at `index`, if it has a BibTeX entry.
    pub fn bibtex_for(&self, index: usize) -> Option<&BibtexFile> {
        self.bibtex.get(index).and_then(Option::as_ref)
    }

    /// Rows matching `search` (case-insensitive substring of any searchable cell).
    pub fn filter(&self, search: Option<&str>) -> Vec<&TableRow> {
        let needle = search.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);
        let Some(needle) = needle else {
            return self.rows.iter().collect();
        };

        self.rows
            .iter()
            .filter(|row| {
                row.cells
                    .iter()
                    .zip(&self.columns)
                    .filter(|(_, col)| col.searchable)
                    .any(|(cell, _)| cell.search_text().to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Slice out one page. `page_length` of zero is treated as one.
    pub fn page(&self, page: usize, page_length: usize, search: Option<&str>) -> TablePage<'_> {
        let page_length = page_length.max(1);
        let matching = self.filter(search);
        let filtered_rows = matching.len();
        let page_count = filtered_rows.div_ceil(page_length);

        let rows = matching
            .into_iter()
            .skip(page.saturating_mul(page_length))
            .take(page_length)
            .collect();

        TablePage {
            columns: &self.columns,
            rows,
            page,
            page_length,
            page_count,
            total_rows: self.rows.len(),
            filtered_rows,
        }
    }
}

fn render_cell(role: ColumnRole, column: &str, row: &Row, names: &TableColumns, url_re: &Regex) -> Cell {
    let value = row.cell(column);
    match role {
        ColumnRole::Title => match extract_url(row.cell(&names.bibtex), url_re) {
            Some(href) => Cell::Link {
                text: value.to_string(),
                href,
            },
            None => Cell::Text {
                text: value.to_string(),
            },
        },
        ColumnRole::Bibtex if value.is_empty() => Cell::Empty,
        ColumnRole::Bibtex => Cell::Download {
            label: "DOWNLOAD",
            file_name: bib_file_name(row, &names.key),
        },
        ColumnRole::Abstract if value.is_empty() => Cell::Empty,
        ColumnRole::Abstract => Cell::AbstractTrigger { label: "INFO" },
        ColumnRole::Key | ColumnRole::Plain => Cell::Text {
            text: value.to_string(),
        },
    }
}

/// The `url = {...}` / `url = "..."` field of a BibTeX entry.
pub fn extract_url(bibtex: &str, url_re: &Regex) -> Option<String> {
    url_re
        .captures(bibtex)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn bib_file_name(row: &Row, key_column: &str) -> String {
    let base = row
        .get(key_column)
        .filter(|k| !k.is_empty())
        .unwrap_or(DEFAULT_BIB_NAME);
    format!("{}.bib", base)
}
