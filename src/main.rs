//! paperlens - Research paper dataset explorer
//!
//! Serves the paper table, summary charts, citation and exports over HTTP,
//! or produces the same artefacts from the command line.
//!
//! ## Usage
//!
//! ### HTTP Server Mode
//! ```bash
//! paperlens serve --port 3000
//! ```
//!
//! ### CLI Mode
//! ```bash
//! paperlens export --output ./downloads
//! paperlens chart llmsused
//! paperlens cite --format apa
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use paperlens::{
    chart::ChartSelection, citation::CitationRecord, config::SiteConfig, export::ExportFormat,
    server, session::Session, source::Source,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Research paper dataset explorer
#[derive(Parser)]
#[command(name = "paperlens")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// JSON config file (default: ~/.config/paperlens/config.json if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dataset CSV path or URL
    #[arg(long, global = true)]
    data: Option<String>,

    /// CITATION.cff path or URL
    #[arg(long, global = true)]
    citation: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the site as an HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Write dataset downloads to a directory
    Export {
        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Formats to write (default: all)
        #[arg(short, long, value_enum)]
        format: Vec<ExportFormat>,
    },

    /// Print a chart configuration as JSON
    Chart {
        /// Chart view: ano, llmsused, benchmarks, metrics, category, conferences, journals
        #[arg(default_value = "ano")]
        view: String,
    },

    /// Print the dataset citation
    Cite {
        #[arg(long, value_enum, default_value = "bibtex")]
        format: CiteFormat,
    },

    /// Print all aggregated counts as JSON
    Summary,
}

#[derive(Clone, Copy, ValueEnum)]
enum CiteFormat {
    Bibtex,
    Apa,
    Text,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = SiteConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(data) = cli.data {
        config.data = Source::parse(&data);
    }
    if let Some(citation) = cli.citation {
        config.citation = Source::parse(&citation);
    }

    match cli.command {
        Commands::Serve { port, host } => {
            let session = load_session(config).await?;
            server::serve(session, &host, port).await.context("Server error")
        }
        Commands::Export { output, format } => {
            let session = load_session(config).await?;
            run_export(session, output, format)
        }
        Commands::Chart { view } => {
            let selection: ChartSelection = view.parse()?;
            let mut session = load_session(config).await?;
            let chart = session.select_chart(selection);
            println!("{}", serde_json::to_string_pretty(&chart.spec)?);
            Ok(())
        }
        Commands::Cite { format } => run_cite(&config, format).await,
        Commands::Summary => {
            let session = load_session(config).await?;
            println!("{}", serde_json::to_string_pretty(session.summaries())?);
            Ok(())
        }
    }
}

async fn load_session(config: SiteConfig) -> Result<Session> {
    let source = config.data.clone();
    Session::load(config)
        .await
        .with_context(|| format!("Failed to load dataset from {}", source))
}

// ============================================================================
// Commands
// ============================================================================

fn run_export(mut session: Session, output_dir: PathBuf, formats: Vec<ExportFormat>) -> Result<()> {
    std::fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

    let formats = if formats.is_empty() {
        ExportFormat::ALL.to_vec()
    } else {
        formats
    };

    for format in formats {
        let download = session.export(format)?;
        let path = output_dir.join(&download.file_name);
        std::fs::write(&path, &download.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), bytes = download.bytes.len(), "Saved");
        println!("Saved: {:?}", path);
    }

    Ok(())
}

async fn run_cite(config: &SiteConfig, format: CiteFormat) -> Result<()> {
    let record = CitationRecord::load(&config.citation)
        .await
        .with_context(|| format!("Failed to load citation from {}", config.citation))?;

    let text = match format {
        CiteFormat::Bibtex => record.to_bibtex(&config.citation_key),
        CiteFormat::Apa => record.to_reference(true),
        CiteFormat::Text => record.to_reference(false),
    };
    println!("{}", text.trim_end());
    Ok(())
}
