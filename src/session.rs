//! Application session.
//!
//! Holds everything the site keeps for the lifetime of a page: the loaded
//! dataset and its summaries, the rendered table, the single chart surface,
//! the citation record and the exporter. Each user action is one method call.

use crate::aggregate::Summaries;
use crate::chart::{ChartInstance, ChartSelection, ChartSurface, ChartView};
use crate::citation::{CitationRecord, CitationService};
use crate::config::SiteConfig;
use crate::dataset::Dataset;
use crate::error::{OptionExt, PaperlensError, Result};
use crate::export::{Download, ExportFormat, Exporter, BIBTEX_CONTENT_TYPE, TEXT_CONTENT_TYPE};
use crate::table::{AbstractPopup, TablePage, TableView};
use tracing::{debug, info, warn};

pub struct Session {
    config: SiteConfig,
    dataset: Dataset,
    summaries: Summaries,
    table: TableView,
    surface: ChartSurface,
    selection: ChartSelection,
    page_length: usize,
    citation: CitationService,
    exporter: Exporter,
}

impl Session {
    /// Build a session over an already loaded dataset and draw the initial chart.
    pub fn new(config: SiteConfig, dataset: Dataset) -> Result<Self> {
        for column in [
            &config.id_column,
            &config.columns.key,
            &config.columns.title,
            &config.columns.bibtex,
            &config.columns.abstract_text,
        ] {
            if !dataset.has_column(column) {
                warn!(column = %column, "Dataset has no such column");
            }
        }

        let summaries = Summaries::compute(dataset.rows(), &config.aggregation);
        let table = TableView::build(&dataset, &config.columns, &config.id_column)?;

        let mut session = Self {
            surface: ChartSurface::new(&config.chart_surface),
            selection: ChartSelection::default(),
            page_length: config.page_length,
            citation: CitationService::new(&config.citation_key),
            exporter: Exporter::new(&config.export_stem, &config.sheet_name),
            config,
            dataset,
            summaries,
            table,
        };
        session.select_chart(ChartSelection::default());

        info!(
            rows = session.dataset.len(),
            years = session.summaries.years.len(),
            "Session ready"
        );
        Ok(session)
    }

    /// Load the dataset named in `config` and build a session over it.
    pub async fn load(config: SiteConfig) -> Result<Self> {
        let dataset = Dataset::load(&config.data, &config.id_column).await?;
        Self::new(config, dataset)
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn summaries(&self) -> &Summaries {
        &self.summaries
    }

    pub fn table(&self) -> &TableView {
        &self.table
    }

    // === Charts ===

    /// Replace the drawn chart with the selected view.
    pub fn select_chart(&mut self, selection: ChartSelection) -> &ChartInstance {
        debug!(view = %selection, "Chart selected");
        self.selection = selection;
        let view = ChartView::from_summaries(selection, &self.summaries);
        self.surface.render(&view)
    }

    pub fn selection(&self) -> ChartSelection {
        self.selection
    }

    pub fn current_chart(&self) -> Option<&ChartInstance> {
        self.surface.current()
    }

    pub fn live_charts(&self) -> u64 {
        self.surface.live_instances()
    }

    // === Table ===

    pub fn page_length(&self) -> usize {
        self.page_length
    }

    /// Change rows per page. Only the configured lengths are accepted.
    pub fn set_page_length(&mut self, length: usize) -> Result<()> {
        if !self.config.page_lengths.contains(&length) {
            return Err(PaperlensError::Validation(format!(
                "Page length must be one of {:?}",
                self.config.page_lengths
            )));
        }
        self.page_length = length;
        Ok(())
    }

    pub fn table_page(&self, page: usize, search: Option<&str>) -> TablePage<'_> {
        self.table.page(page, self.page_length, search)
    }

    /// Abstract of the table row at `index`.
    pub fn abstract_for(&self, index: usize) -> Result<&AbstractPopup> {
        self.table
            .abstract_for(index)
            .ok_or_not_found(&format!("abstract for row {}", index))
    }

    pub fn row_bibtex(&self, index: usize) -> Result<Download> {
        let file = self
            .table
            .bibtex_for(index)
            .ok_or_not_found(&format!("BibTeX for row {}", index))?;
        Ok(Download::new(&file.file_name, TEXT_CONTENT_TYPE, file.content.as_bytes()))
    }

    // === Exports ===

    pub fn export(&mut self, format: ExportFormat) -> Result<Download> {
        self.exporter.export(format, &self.dataset)
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    // === Citation ===

    pub fn resolve_citation(&mut self, outcome: Result<CitationRecord>) {
        self.citation.resolve(outcome);
    }

    pub fn citation(&self) -> &CitationService {
        &self.citation
    }

    pub fn citation_bibtex(&self) -> Result<Download> {
        let file = self.citation.bibtex_file()?;
        Ok(Download::new(&file.file_name, BIBTEX_CONTENT_TYPE, file.content))
    }

    pub fn citation_html(&self) -> Result<String> {
        self.citation.reference_html()
    }

    pub fn citation_text(&self) -> Result<String> {
        self.citation.reference_text()
    }
}
