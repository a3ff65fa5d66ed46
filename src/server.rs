//! HTTP front-end for the site.
//!
//! One [`Session`] is shared behind an async mutex, so requests are handled
//! one at a time against the same state, like events on a single page.

use crate::chart::ChartSelection;
use crate::citation::CitationRecord;
use crate::error::{PaperlensError, Result};
use crate::export::{Download, ExportFormat};
use crate::session::Session;
use crate::source::Source;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub type SharedSession = Arc<Mutex<Session>>;

impl IntoResponse for PaperlensError {
    fn into_response(self) -> Response {
        let status = match self {
            PaperlensError::CitationNotLoaded => StatusCode::CONFLICT,
            PaperlensError::NotFound(_) => StatusCode::NOT_FOUND,
            PaperlensError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Download {
    fn into_response(self) -> Response {
        let disposition = format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            self.file_name.replace('"', ""),
            urlencoding::encode(&self.file_name)
        );
        (
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}

/// Routes of the site.
pub fn router(session: SharedSession) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/papers", get(papers_handler))
        .route("/api/papers/{row}/abstract", get(abstract_handler))
        .route("/api/papers/{row}/bibtex", get(row_bibtex_handler))
        .route("/api/summary", get(summary_handler))
        .route("/api/charts", get(current_chart_handler))
        .route("/api/charts/{view}", get(chart_handler))
        .route("/download/{file}", get(download_handler))
        .route("/citation/bibtex", get(citation_bibtex_handler))
        .route("/citation/apa", get(citation_apa_handler))
        .route("/citation/text", get(citation_text_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(session)
}

/// Fetch the citation metadata in the background and hand the outcome to the session.
pub fn spawn_citation_loader(session: SharedSession, source: Source) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = CitationRecord::load(&source).await;
        session.lock().await.resolve_citation(outcome);
    })
}

/// Serve the site until the process is stopped.
pub async fn serve(session: Session, host: &str, port: u16) -> Result<()> {
    let citation_source = session.config().citation.clone();
    let session = Arc::new(Mutex::new(session));
    spawn_citation_loader(session.clone(), citation_source);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| PaperlensError::Config(format!("Invalid host:port: {}", e)))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, router(session)).await?;
    Ok(())
}

async fn health_handler() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct PapersQuery {
    #[serde(default)]
    page: usize,
    length: Option<usize>,
    search: Option<String>,
}

async fn papers_handler(
    State(session): State<SharedSession>,
    Query(query): Query<PapersQuery>,
) -> Result<Response> {
    let mut session = session.lock().await;
    if let Some(length) = query.length {
        session.set_page_length(length)?;
    }
    let page = session.table_page(query.page, query.search.as_deref());
    Ok(Json(page).into_response())
}

async fn abstract_handler(
    State(session): State<SharedSession>,
    Path(row): Path<usize>,
) -> Result<Response> {
    let session = session.lock().await;
    Ok(Json(session.abstract_for(row)?).into_response())
}

async fn row_bibtex_handler(
    State(session): State<SharedSession>,
    Path(row): Path<usize>,
) -> Result<Download> {
    session.lock().await.row_bibtex(row)
}

async fn summary_handler(State(session): State<SharedSession>) -> Response {
    let session = session.lock().await;
    Json(session.summaries()).into_response()
}

async fn current_chart_handler(State(session): State<SharedSession>) -> Response {
    let session = session.lock().await;
    Json(session.current_chart()).into_response()
}

async fn chart_handler(
    State(session): State<SharedSession>,
    Path(view): Path<String>,
) -> Result<Response> {
    let selection: ChartSelection = view.parse()?;
    let mut session = session.lock().await;
    Ok(Json(session.select_chart(selection)).into_response())
}

async fn download_handler(
    State(session): State<SharedSession>,
    Path(file): Path<String>,
) -> Result<Download> {
    let mut session = session.lock().await;
    let stem = session.config().export_stem.clone();
    let format = ExportFormat::ALL
        .into_iter()
        .find(|f| f.file_name(&stem) == file)
        .ok_or_else(|| PaperlensError::NotFound(file.clone()))?;
    session.export(format)
}

async fn citation_bibtex_handler(State(session): State<SharedSession>) -> Result<Download> {
    session.lock().await.citation_bibtex()
}

async fn citation_apa_handler(State(session): State<SharedSession>) -> Result<Html<String>> {
    Ok(Html(session.lock().await.citation_html()?))
}

async fn citation_text_handler(State(session): State<SharedSession>) -> Result<String> {
    session.lock().await.citation_text()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::dataset::Dataset;

    const CSV: &str = concat!(
        "ID,KEY,TITLE,YEAR,PUBLICATION TYPE,BIBTEX,ABSTRACT\n",
        "1,k1,Alpha,2023,Journal,@misc{k1},About alpha\n",
        "2,k2,Beta,2024,Conference,,\n",
        "3,k3,Gamma,2024,Journal,,\n",
    );

    fn shared() -> Result<SharedSession> {
        let dataset = Dataset::parse(CSV.to_string(), "ID")?;
        Ok(Arc::new(Mutex::new(Session::new(SiteConfig::default(), dataset)?)))
    }

    #[test]
    fn test_error_status_codes() {
        let status = |e: PaperlensError| e.into_response().status();
        assert_eq!(status(PaperlensError::CitationNotLoaded), StatusCode::CONFLICT);
        assert_eq!(status(PaperlensError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(PaperlensError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(PaperlensError::Config("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_download_headers() {
        let response = Download::new("doe 2023.bib", "text/plain", "x").into_response();
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(disposition.starts_with("attachment; filename=\"doe 2023.bib\""));
        assert!(disposition.ends_with("UTF-8''doe%202023.bib"));
    }

    #[tokio::test]
    async fn test_citation_routes_before_load() -> Result<()> {
        let session = shared()?;
        let result = citation_text_handler(State(session.clone())).await;
        assert!(matches!(result, Err(PaperlensError::CitationNotLoaded)));
        Ok(())
    }

    #[tokio::test]
    async fn test_background_citation_failure_keeps_blocking() -> Result<()> {
        let session = shared()?;
        spawn_citation_loader(session.clone(), Source::parse("/nonexistent/CITATION.cff"))
            .await
            .map_err(|e| PaperlensError::Config(e.to_string()))?;
        assert!(!session.lock().await.citation().is_loaded());
        assert!(citation_bibtex_handler(State(session)).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_download_by_file_name() -> Result<()> {
        let session = shared()?;
        let csv = download_handler(State(session.clone()), Path("Papers.csv".to_string())).await?;
        assert_eq!(csv.bytes, CSV.as_bytes());
        let missing = download_handler(State(session), Path("Papers.txt".to_string())).await;
        assert!(matches!(missing, Err(PaperlensError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_papers_page_query() -> Result<()> {
        let session = shared()?;
        let query = PapersQuery {
            page: 0,
            length: Some(10),
            search: Some("gamma".to_string()),
        };
        let response = papers_handler(State(session.clone()), Query(query)).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(session.lock().await.page_length(), 10);
        assert_eq!(session.lock().await.table_page(0, Some("gamma")).filtered_rows, 1);

        let bad = PapersQuery {
            page: 0,
            length: Some(7),
            search: None,
        };
        let result = papers_handler(State(session.clone()), Query(bad)).await;
        let status = match result {
            Ok(response) => response.status(),
            Err(e) => e.into_response().status(),
        };
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(session.lock().await.page_length(), 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_row_side_data_routes() -> Result<()> {
        let session = shared()?;
        let popup = abstract_handler(State(session.clone()), Path(0)).await?;
        assert_eq!(popup.status(), StatusCode::OK);
        let missing = abstract_handler(State(session.clone()), Path(1)).await;
        assert!(matches!(missing, Err(PaperlensError::NotFound(_))));

        let bib = row_bibtex_handler(State(session.clone()), Path(0)).await?;
        assert_eq!(bib.file_name, "k1.bib");
        assert_eq!(bib.bytes, b"@misc{k1}");
        let out_of_range = row_bibtex_handler(State(session), Path(9)).await;
        assert!(matches!(out_of_range, Err(PaperlensError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_chart_view() -> Result<()> {
        let session = shared()?;
        let result = chart_handler(State(session), Path("radar".to_string())).await;
        assert!(matches!(result, Err(PaperlensError::Validation(_))));
        Ok(())
    }
}
