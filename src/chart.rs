//! Chart views and the single chart surface.
//!
//! A chart is described as a Chart.js configuration document ([`ChartSpec`]).
//! The site draws into one fixed canvas, modelled by [`ChartSurface`]: it holds
//! at most one live [`ChartInstance`] and always releases the old instance
//! before creating a new one.

use crate::aggregate::{CrossTab, Summaries, Tally};
use crate::error::{PaperlensError, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Canvas element the site renders charts into
pub const DEFAULT_SURFACE_ID: &str = "grafica";

/// Colour for any series key without an explicit colour
pub const NEUTRAL_GRAY: &str = "hsl(0, 0%, 80%)";

/// Y-axis title for single-series bar charts
pub const ARTICLES_AXIS_TITLE: &str = "Nº Articles";

/// Series order and colours for the publications-per-year chart.
pub const PUBLICATION_TYPE_COLORS: [(&str, &str); 3] = [
    ("Journal", "hsl(120, 70%, 80%)"),
    ("Conference", "hsl(220, 70%, 80%)"),
    ("arXiv", "hsl(0, 70%, 80%)"),
];

/// Series order and colours for the category vs. LLM approach chart.
pub const APPROACH_TYPE_COLORS: [(&str, &str); 5] = [
    ("LLM-Pure-Prompting", "hsl(200,70%,80%)"),
    ("Hybrid-Prompting", "hsl(200,70%,40%)"),
    ("LLM-Pure-FineTune", "hsl(0,70%,80%)"),
    ("Hybrid-FineTune", "hsl(0,70%,40%)"),
    ("None", "hsl(0,0%,80%)"),
];

/// Evenly spread `count` hues around the colour wheel.
pub fn hue_wheel(count: usize, lightness: u8) -> Vec<String> {
    (0..count)
        .map(|i| format!("hsl({}, 70%, {}%)", (i * 360) as f64 / count as f64, lightness))
        .collect()
}

// === Chart.js configuration ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Colors {
    Single(String),
    PerItem(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<u64>,
    #[serde(rename = "backgroundColor")]
    pub background_color: Colors,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Series>,
}

/// A complete chart configuration, ready to hand to Chart.js.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: Value,
}

// === Views ===

/// Everything needed to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartView {
    /// One bar per label, hue-wheel coloured, legend hidden
    Bar {
        labels: Vec<String>,
        values: Vec<u64>,
        series_name: String,
    },
    /// One slice per label, hue-wheel coloured
    Pie { labels: Vec<String>, values: Vec<u64> },
    /// Vertical bars per year, stacked by the fixed publication-type order
    StackedByYear { years: Vec<String>, cells: CrossTab },
    /// Horizontal bars per label, stacked by caller-supplied series
    HorizontalStacked {
        labels: Vec<String>,
        series_keys: Vec<String>,
        lookup: CrossTab,
        colors: Vec<(String, String)>,
        x_title: String,
        y_title: String,
    },
}

impl ChartView {
    pub fn to_spec(&self) -> ChartSpec {
        match self {
            ChartView::Bar {
                labels,
                values,
                series_name,
            } => ChartSpec {
                kind: ChartKind::Bar,
                data: ChartData {
                    labels: labels.clone(),
                    datasets: vec![Series {
                        label: Some(series_name.clone()),
                        data: values.clone(),
                        background_color: Colors::PerItem(hue_wheel(labels.len(), 65)),
                    }],
                },
                options: json!({
                    "responsive": true,
                    "maintainAspectRatio": false,
                    "plugins": { "legend": { "display": false } },
                    "scales": {
                        "y": { "title": { "display": true, "text": ARTICLES_AXIS_TITLE } }
                    }
                }),
            },
            ChartView::Pie { labels, values } => ChartSpec {
                kind: ChartKind::Pie,
                data: ChartData {
                    labels: labels.clone(),
                    datasets: vec![Series {
                        label: None,
                        data: values.clone(),
                        background_color: Colors::PerItem(hue_wheel(labels.len(), 65)),
                    }],
                },
                options: json!({
                    "responsive": true,
                    "maintainAspectRatio": false,
                    "plugins": { "legend": { "position": "top" } }
                }),
            },
            ChartView::StackedByYear { years, cells } => ChartSpec {
                kind: ChartKind::Bar,
                data: ChartData {
                    labels: years.clone(),
                    datasets: PUBLICATION_TYPE_COLORS
                        .iter()
                        .map(|(kind, color)| Series {
                            label: Some(kind.to_string()),
                            data: years.iter().map(|y| cells.get(y, kind)).collect(),
                            background_color: Colors::Single(color.to_string()),
                        })
                        .collect(),
                },
                options: json!({
                    "responsive": true,
                    "maintainAspectRatio": false,
                    "plugins": { "legend": { "position": "top" } },
                    "scales": {
                        "x": { "stacked": true },
                        "y": { "stacked": true, "beginAtZero": true }
                    }
                }),
            },
            ChartView::HorizontalStacked {
                labels,
                series_keys,
                lookup,
                colors,
                x_title,
                y_title,
            } => ChartSpec {
                kind: ChartKind::Bar,
                data: ChartData {
                    labels: labels.clone(),
                    datasets: series_keys
                        .iter()
                        .map(|key| Series {
                            label: Some(key.clone()),
                            data: labels.iter().map(|l| lookup.get(l, key)).collect(),
                            background_color: Colors::Single(
                                colors
                                    .iter()
                                    .find(|(k, _)| k == key)
                                    .map(|(_, c)| c.clone())
                                    .unwrap_or_else(|| NEUTRAL_GRAY.to_string()),
                            ),
                        })
                        .collect(),
                },
                options: json!({
                    "indexAxis": "y",
                    "responsive": true,
                    "maintainAspectRatio": false,
                    "plugins": { "legend": { "position": "top" } },
                    "scales": {
                        "x": {
                            "stacked": true,
                            "beginAtZero": true,
                            "title": { "display": true, "text": x_title }
                        },
                        "y": {
                            "stacked": true,
                            "title": { "display": true, "text": y_title }
                        }
                    }
                }),
            },
        }
    }

    /// Build the view for a user selection from precomputed summaries.
    pub fn from_summaries(selection: ChartSelection, summaries: &Summaries) -> Self {
        let bar = |tally: &Tally, name: &str| ChartView::Bar {
            labels: tally.labels(),
            values: tally.values(),
            series_name: name.to_string(),
        };
        let pie = |tally: &Tally| ChartView::Pie {
            labels: tally.labels(),
            values: tally.values(),
        };

        match selection {
            ChartSelection::PublicationsPerYear => ChartView::StackedByYear {
                years: summaries.years.clone(),
                cells: summaries.by_year_and_type.clone(),
            },
            ChartSelection::LlmsUsed => bar(&summaries.llms_used, "LLMs Used"),
            ChartSelection::Benchmarks => bar(&summaries.benchmarks, "Benchmarks"),
            ChartSelection::Metrics => bar(&summaries.metrics, "Metrics"),
            ChartSelection::Category => ChartView::HorizontalStacked {
                labels: summaries.category_by_approach.labels_by_total_desc(),
                series_keys: APPROACH_TYPE_COLORS.iter().map(|(k, _)| k.to_string()).collect(),
                lookup: summaries.category_by_approach.clone(),
                colors: APPROACH_TYPE_COLORS
                    .iter()
                    .map(|(k, c)| (k.to_string(), c.to_string()))
                    .collect(),
                x_title: ARTICLES_AXIS_TITLE.to_string(),
                y_title: "Categories".to_string(),
            },
            ChartSelection::Conferences => pie(&summaries.venues.conferences),
            ChartSelection::Journals => pie(&summaries.venues.journals),
        }
    }
}

/// Chart choices offered by the selector control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChartSelection {
    #[default]
    PublicationsPerYear,
    LlmsUsed,
    Benchmarks,
    Metrics,
    Category,
    Conferences,
    Journals,
}

impl ChartSelection {
    pub const ALL: [ChartSelection; 7] = [
        ChartSelection::PublicationsPerYear,
        ChartSelection::LlmsUsed,
        ChartSelection::Benchmarks,
        ChartSelection::Metrics,
        ChartSelection::Category,
        ChartSelection::Conferences,
        ChartSelection::Journals,
    ];

    /// Selector option value
    pub fn key(self) -> &'static str {
        match self {
            ChartSelection::PublicationsPerYear => "ano",
            ChartSelection::LlmsUsed => "llmsused",
            ChartSelection::Benchmarks => "benchmarks",
            ChartSelection::Metrics => "metrics",
            ChartSelection::Category => "category",
            ChartSelection::Conferences => "conferences",
            ChartSelection::Journals => "journals",
        }
    }
}

impl FromStr for ChartSelection {
    type Err = PaperlensError;

    fn from_str(s: &str) -> Result<Self> {
        ChartSelection::ALL
            .into_iter()
            .find(|sel| sel.key() == s)
            .ok_or_else(|| PaperlensError::Validation(format!("Unknown chart view: {}", s)))
    }
}

impl fmt::Display for ChartSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// === Surface ===

/// A chart currently drawn on the surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartInstance {
    pub id: u64,
    pub surface: String,
    pub spec: ChartSpec,
}

/// The single rendering surface. Owns at most one live chart.
#[derive(Debug)]
pub struct ChartSurface {
    element_id: String,
    current: Option<ChartInstance>,
    next_id: u64,
    created: u64,
    released: u64,
}

impl ChartSurface {
    pub fn new(element_id: &str) -> Self {
        Self {
            element_id: element_id.to_string(),
            current: None,
            next_id: 1,
            created: 0,
            released: 0,
        }
    }

    /// Destroy the live chart, if any.
    pub fn release(&mut self) -> Option<ChartInstance> {
        let old = self.current.take();
        if let Some(ref instance) = old {
            self.released += 1;
            debug!(id = instance.id, surface = %self.element_id, "Released chart");
        }
        old
    }

    /// Replace whatever is drawn with `view`.
    pub fn render(&mut self, view: &ChartView) -> &ChartInstance {
        self.release();

        let instance = ChartInstance {
            id: self.next_id,
            surface: self.element_id.clone(),
            spec: view.to_spec(),
        };
        self.next_id += 1;
        self.created += 1;
        debug!(id = instance.id, surface = %self.element_id, "Created chart");

        self.current.insert(instance)
    }

    pub fn current(&self) -> Option<&ChartInstance> {
        self.current.as_ref()
    }

    /// Charts created and not yet released. Never more than one.
    pub fn live_instances(&self) -> u64 {
        self.created - self.released
    }
}

impl Default for ChartSurface {
    fn default() -> Self {
        Self::new(DEFAULT_SURFACE_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{cross_tab_single, AggregationConfig};
    use crate::dataset::Row;

    fn row(year: &str, kind: &str) -> Row {
        Row::from_pairs([
            ("YEAR".to_string(), year.to_string()),
            ("PUBLICATION TYPE".to_string(), kind.to_string()),
        ])
    }

    #[test]
    fn test_hue_wheel() {
        assert_eq!(
            hue_wheel(3, 65),
            vec!["hsl(0, 70%, 65%)", "hsl(120, 70%, 65%)", "hsl(240, 70%, 65%)"]
        );
        assert!(hue_wheel(0, 65).is_empty());
    }

    #[test]
    fn test_stacked_by_year_fixed_order() {
        let rows = vec![row("2023", "Journal"), row("2023", "Conference"), row("2024", "Journal")];
        let view = ChartView::StackedByYear {
            years: vec!["2023".into(), "2024".into()],
            cells: cross_tab_single(&rows, "YEAR", "PUBLICATION TYPE"),
        };
        let spec = view.to_spec();
        let labels: Vec<_> = spec.data.datasets.iter().filter_map(|d| d.label.clone()).collect();
        assert_eq!(labels, vec!["Journal", "Conference", "arXiv"]);
        assert_eq!(spec.data.datasets[0].data, vec![1, 1]);
        assert_eq!(spec.data.datasets[1].data, vec![1, 0]);
        assert_eq!(spec.data.datasets[2].data, vec![0, 0]);
        assert_eq!(spec.options["scales"]["x"]["stacked"], json!(true));
    }

    #[test]
    fn test_horizontal_stacked_defaults() {
        let mut lookup = CrossTab::new();
        lookup.add("Testing", "A");
        let view = ChartView::HorizontalStacked {
            labels: vec!["Testing".into(), "Repair".into()],
            series_keys: vec!["A".into(), "B".into()],
            lookup,
            colors: vec![("A".into(), "red".into())],
            x_title: "X".into(),
            y_title: "Y".into(),
        };
        let spec = view.to_spec();
        assert_eq!(spec.data.datasets[0].data, vec![1, 0]);
        assert_eq!(spec.data.datasets[1].data, vec![0, 0]);
        assert_eq!(spec.data.datasets[1].background_color, Colors::Single(NEUTRAL_GRAY.into()));
        assert_eq!(spec.options["indexAxis"], json!("y"));
        assert_eq!(spec.options["scales"]["y"]["title"]["text"], json!("Y"));
    }

    #[test]
    fn test_bar_spec_shape() -> serde_json::Result<()> {
        let view = ChartView::Bar {
            labels: vec!["GPT-4".into(), "Claude".into()],
            values: vec![3, 1],
            series_name: "LLMs Used".into(),
        };
        let value = serde_json::to_value(view.to_spec())?;
        assert_eq!(value["type"], json!("bar"));
        assert_eq!(value["data"]["datasets"][0]["backgroundColor"][1], json!("hsl(180, 70%, 65%)"));
        assert_eq!(value["options"]["plugins"]["legend"]["display"], json!(false));
        assert_eq!(value["options"]["scales"]["y"]["title"]["text"], json!("Nº Articles"));
        Ok(())
    }

    #[test]
    fn test_pie_has_no_series_label() -> serde_json::Result<()> {
        let view = ChartView::Pie {
            labels: vec!["ICSE".into()],
            values: vec![2],
        };
        let value = serde_json::to_value(view.to_spec())?;
        assert_eq!(value["type"], json!("pie"));
        assert!(value["data"]["datasets"][0].get("label").is_none());
        Ok(())
    }

    #[test]
    fn test_selection_keys() -> Result<()> {
        for sel in ChartSelection::ALL {
            assert_eq!(sel.key().parse::<ChartSelection>()?, sel);
        }
        assert!("pie".parse::<ChartSelection>().is_err());
        assert_eq!(ChartSelection::default(), ChartSelection::PublicationsPerYear);
        Ok(())
    }

    #[test]
    fn test_surface_keeps_one_instance() {
        let rows = vec![row("2023", "Journal")];
        let summaries = Summaries::compute(&rows, &AggregationConfig::default());
        let mut surface = ChartSurface::default();
        assert_eq!(surface.live_instances(), 0);

        for sel in ChartSelection::ALL.into_iter().chain(ChartSelection::ALL) {
            let id = surface.render(&ChartView::from_summaries(sel, &summaries)).id;
            assert_eq!(surface.live_instances(), 1);
            assert_eq!(surface.current().map(|c| c.id), Some(id));
        }

        assert!(surface.release().is_some());
        assert_eq!(surface.live_instances(), 0);
        assert!(surface.release().is_none());
    }

    #[test]
    fn test_category_view_orders_by_total() {
        let rows = vec![
            Row::from_pairs([
                ("CATEGORY".to_string(), "Repair".to_string()),
                ("LLM APPROACH TYPE".to_string(), "Hybrid-Prompting".to_string()),
            ]),
            Row::from_pairs([
                ("CATEGORY".to_string(), "Testing, Repair".to_string()),
                ("LLM APPROACH TYPE".to_string(), "None".to_string()),
            ]),
        ];
        let summaries = Summaries::compute(&rows, &AggregationConfig::default());
        match ChartView::from_summaries(ChartSelection::Category, &summaries) {
            ChartView::HorizontalStacked { labels, series_keys, .. } => {
                assert_eq!(labels, vec!["Repair", "Testing"]);
                assert_eq!(series_keys.len(), 5);
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }
}
