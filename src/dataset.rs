//! Paper dataset loading.
//!
//! The dataset is a CSV file whose first record is the header. Each record
//! becomes a [`Row`] keyed by header name. Records without a non-empty
//! identifier are dropped at load time.

use crate::error::Result;
use crate::source::Source;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{debug, info};

/// One parsed record: column name -> cell text, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            cells: pairs.into_iter().collect(),
        }
    }

    /// Raw cell text, if the column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed cell text, or `None` when the column is missing or blank.
    pub fn field(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Raw cell text, empty when the column is missing.
    pub fn cell(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// The loaded paper list, its header and the original CSV text.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Row>,
    raw: String,
}

impl Dataset {
    /// Parse CSV text, keeping only records with a non-empty `id_column`.
    ///
    /// Short records are padded with empty cells; extra trailing cells are ignored.
    pub fn parse(raw: String, id_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(raw.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        let mut discarded = 0usize;
        for record in reader.records() {
            let record = record?;
            let row = Row::from_pairs(headers.iter().enumerate().map(|(i, h)| {
                (h.clone(), record.get(i).unwrap_or("").to_string())
            }));
            if row.field(id_column).is_some() {
                rows.push(row);
            } else {
                discarded += 1;
            }
        }

        if discarded > 0 {
            debug!(discarded, id_column, "Dropped records without identifier");
        }

        Ok(Self { headers, rows, raw })
    }

    /// Fetch and parse the dataset.
    pub async fn load(source: &Source, id_column: &str) -> Result<Self> {
        let raw = source.fetch_text().await?;
        let dataset = Self::parse(raw, id_column)?;
        info!(
            source = %source,
            rows = dataset.len(),
            columns = dataset.headers.len(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The CSV text exactly as it was read.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// First row whose `column` equals `value` (trimmed).
    pub fn find(&self, column: &str, value: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.field(column) == Some(value.trim()))
    }
}
