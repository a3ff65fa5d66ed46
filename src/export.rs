//! Dataset export to downloadable files.
//!
//! CSV is the source text passed through untouched, JSON is the parsed row
//! list pretty-printed, and XLSX is a single-sheet workbook. The spreadsheet
//! encoder is only set up on the first XLSX request and reused afterwards.

use crate::dataset::Dataset;
use crate::error::Result;
use rust_xlsxwriter::Workbook;
use tracing::{debug, info};

/// Default base name of exported files
pub const DEFAULT_FILE_STEM: &str = "Papers";

/// Default sheet name in the exported workbook
pub const DEFAULT_SHEET_NAME: &str = "Papers";

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const BIBTEX_CONTENT_TYPE: &str = "text/x-bibtex";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A file ready to be offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn new(file_name: &str, content_type: &'static str, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type,
            bytes: bytes.into(),
        }
    }
}

/// Export formats offered on the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Json, ExportFormat::Xlsx];

    /// Download name for a dataset called `stem`
    pub fn file_name(self, stem: &str) -> String {
        match self {
            ExportFormat::Csv => format!("{}.csv", stem),
            ExportFormat::Json => format!("{}.json", stem),
            ExportFormat::Xlsx => format!("{}.xlsx", stem),
        }
    }
}

/// Writes the row table into a workbook.
#[derive(Debug, Clone)]
pub struct XlsxEncoder {
    sheet_name: String,
}

impl XlsxEncoder {
    pub fn new(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
        }
    }

    /// One sheet: header row, then every row's cells in header order.
    pub fn encode(&self, dataset: &Dataset) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name)?;

        for (col, header) in dataset.headers().iter().enumerate() {
            sheet.write_string(0, col as u16, header)?;
        }
        for (r, row) in dataset.rows().iter().enumerate() {
            for (col, header) in dataset.headers().iter().enumerate() {
                let value = row.cell(header);
                if !value.is_empty() {
                    sheet.write_string(r as u32 + 1, col as u16, value)?;
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

/// Produces every dataset download.
#[derive(Debug, Clone)]
pub struct Exporter {
    stem: String,
    sheet_name: String,
    /// Unset until the first spreadsheet export
    encoder: Option<XlsxEncoder>,
    loads: u32,
}

impl Exporter {
    pub fn new(stem: &str, sheet_name: &str) -> Self {
        Self {
            stem: stem.to_string(),
            sheet_name: sheet_name.to_string(),
            encoder: None,
            loads: 0,
        }
    }

    /// Get the spreadsheet encoder, setting it up on first use.
    pub fn acquire_encoder(&mut self) -> &XlsxEncoder {
        if self.encoder.is_none() {
            info!(sheet = %self.sheet_name, "Loading spreadsheet encoder");
            self.loads += 1;
        }
        let sheet_name = &self.sheet_name;
        self.encoder.get_or_insert_with(|| XlsxEncoder::new(sheet_name))
    }

    pub fn encoder_loaded(&self) -> bool {
        self.encoder.is_some()
    }

    /// How many times the encoder has been set up.
    pub fn encoder_loads(&self) -> u32 {
        self.loads
    }

    pub fn csv(&self, dataset: &Dataset) -> Download {
        Download::new(
            &ExportFormat::Csv.file_name(&self.stem),
            CSV_CONTENT_TYPE,
            dataset.raw().as_bytes(),
        )
    }

    pub fn json(&self, dataset: &Dataset) -> Result<Download> {
        let text = serde_json::to_string_pretty(dataset.rows())?;
        Ok(Download::new(
            &ExportFormat::Json.file_name(&self.stem),
            JSON_CONTENT_TYPE,
            text,
        ))
    }

    pub fn xlsx(&mut self, dataset: &Dataset) -> Result<Download> {
        let file_name = ExportFormat::Xlsx.file_name(&self.stem);
        let bytes = self.acquire_encoder().encode(dataset)?;
        debug!(rows = dataset.len(), bytes = bytes.len(), "Encoded workbook");
        Ok(Download::new(&file_name, XLSX_CONTENT_TYPE, bytes))
    }

    pub fn export(&mut self, format: ExportFormat, dataset: &Dataset) -> Result<Download> {
        match format {
            ExportFormat::Csv => Ok(self.csv(dataset)),
            ExportFormat::Json => self.json(dataset),
            ExportFormat::Xlsx => self.xlsx(dataset),
        }
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_STEM, DEFAULT_SHEET_NAME)
    }
}
