//! # paperlens
//!
//! Research paper dataset explorer: table, summary charts, citation and data exports.
//!
//! ## Modules
//!
//! - [`dataset`] - CSV loading into rows keyed by header
//! - [`aggregate`] - Counting and grouping rows for charts
//! - [`chart`] - Chart.js views and the single chart surface
//! - [`table`] - Paged, searchable table with per-row actions
//! - [`citation`] - CITATION.cff parsing, BibTeX and APA formatting
//! - [`export`] - CSV / JSON / XLSX downloads
//! - [`session`] - Application state for one site session
//! - [`server`] - HTTP front-end
//! - [`config`] - Site configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use paperlens::{chart::ChartSelection, config::SiteConfig, session::Session};
//!
//! #[tokio::main]
//! async fn main() -> paperlens::Result<()> {
//!     let mut session = Session::load(SiteConfig::default()).await?;
//!     let chart = session.select_chart(ChartSelection::LlmsUsed);
//!     println!("{}", serde_json::to_string_pretty(&chart.spec)?);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod chart;
pub mod citation;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod server;
pub mod session;
pub mod source;
pub mod table;

pub use error::{PaperlensError, Result};
