//! Citation metadata for the dataset itself.
//!
//! Reads the `preferred-citation` block of a `CITATION.cff` file and formats
//! it as a BibTeX entry or an APA-style reference string. The record arrives
//! asynchronously; until it does, every consumer gets
//! [`PaperlensError::CitationNotLoaded`].

use crate::error::{PaperlensError, Result};
use crate::source::Source;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info};

/// BibTeX key of the dataset citation
pub const DEFAULT_CITATION_KEY: &str = "Augusto2026";

const DOI_RESOLVER: &str = "https://doi.org/";

// === CITATION.cff document ===

#[derive(Debug, Deserialize)]
struct CffDocument {
    #[serde(rename = "preferred-citation")]
    preferred_citation: Option<CffCitation>,
    #[serde(default, deserialize_with = "scalar")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CffCitation {
    #[serde(default)]
    authors: Vec<CffAuthor>,
    #[serde(default, deserialize_with = "scalar")]
    title: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    year: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    doi: Option<String>,
    #[serde(default)]
    journal: Option<CffJournal>,
}

#[derive(Debug, Deserialize)]
struct CffAuthor {
    #[serde(rename = "given-names", default, deserialize_with = "scalar")]
    given_names: Option<String>,
    #[serde(rename = "family-names", default, deserialize_with = "scalar")]
    family_names: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    orcid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CffJournal {
    #[serde(default, deserialize_with = "scalar")]
    name: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    year: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    volume: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    issue: Option<String>,
    #[serde(default)]
    pages: Option<CffPages>,
    #[serde(default, deserialize_with = "scalar")]
    publisher: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CffPages {
    #[serde(default, deserialize_with = "scalar")]
    start: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    end: Option<String>,
}

/// Accept any YAML scalar (string, number, bool) as text.
fn scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

// === Record ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub given: String,
    pub family: String,
    pub orcid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Journal {
    pub name: String,
    pub volume: String,
    pub issue: String,
    pub pages: Option<PageRange>,
    pub publisher: String,
}

/// The preferred citation of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationRecord {
    pub authors: Vec<Author>,
    pub title: String,
    pub year: String,
    pub journal: Option<Journal>,
    pub doi: Option<String>,
    pub url: Option<String>,
}

impl CitationRecord {
    /// Parse the `preferred-citation` block of a CITATION.cff document.
    pub fn from_cff(text: &str) -> Result<Self> {
        let doc: CffDocument = serde_yaml::from_str(text)?;
        let pc = doc
            .preferred_citation
            .ok_or_else(|| PaperlensError::Validation("missing preferred-citation".to_string()))?;

        let year = pc
            .year
            .or_else(|| pc.journal.as_ref().and_then(|j| j.year.clone()))
            .unwrap_or_default();

        Ok(Self {
            authors: pc
                .authors
                .into_iter()
                .map(|a| Author {
                    given: a.given_names.unwrap_or_default(),
                    family: a.family_names.unwrap_or_default(),
                    orcid: a.orcid,
                })
                .collect(),
            title: pc.title.unwrap_or_default(),
            year,
            journal: pc.journal.map(|j| Journal {
                name: j.name.unwrap_or_default(),
                volume: j.volume.unwrap_or_default(),
                issue: j.issue.unwrap_or_default(),
                pages: j.pages.map(|p| PageRange {
                    start: p.start.unwrap_or_default(),
                    end: p.end.unwrap_or_default(),
                }),
                publisher: j.publisher.unwrap_or_default(),
            }),
            doi: pc.doi,
            url: doc.url,
        })
    }

    /// Fetch and parse the citation resource.
    pub async fn load(source: &Source) -> Result<Self> {
        let text = source.fetch_text().await?;
        Self::from_cff(&text)
    }

    fn pages(&self) -> String {
        self.journal
            .as_ref()
            .and_then(|j| j.pages.as_ref())
            .map(|p| format!("{}-{}", p.start, p.end))
            .unwrap_or_default()
    }

    fn journal_field(&self, f: impl Fn(&Journal) -> &str) -> &str {
        self.journal.as_ref().map(f).unwrap_or("")
    }

    /// BibTeX `@article` entry under `key`.
    pub fn to_bibtex(&self, key: &str) -> String {
        let authors = self
            .authors
            .iter()
            .map(|a| format!("{}, {}", a.family, a.given))
            .collect::<Vec<_>>()
            .join(" and ");
        let pages = self.pages();

        let fields = [
            ("author", authors.as_str()),
            ("title", self.title.as_str()),
            ("journal", self.journal_field(|j| j.name.as_str())),
            ("year", self.year.as_str()),
            ("volume", self.journal_field(|j| j.volume.as_str())),
            ("number", self.journal_field(|j| j.issue.as_str())),
            ("pages", pages.as_str()),
            ("publisher", self.journal_field(|j| j.publisher.as_str())),
            ("doi", self.doi.as_deref().unwrap_or("")),
        ];

        let body = fields
            .iter()
            .map(|(name, value)| format!("  {:<9} = {{{}}}", name, value))
            .collect::<Vec<_>>()
            .join(",\n");

        format!("@article{{{},\n{}\n}}\n", key, body)
    }

    /// APA-style reference. With `italic`, the journal name is wrapped in `<i>`.
    pub fn to_reference(&self, italic: bool) -> String {
        let names: Vec<String> = self
            .authors
            .iter()
            .map(|a| match a.given.chars().next() {
                Some(initial) => format!("{}, {}.", a.family, initial),
                None => a.family.clone(),
            })
            .collect();

        let authors = match names.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            [init @ .., last] => format!("{}, & {}", init.join(", "), last),
        };

        let journal = self.journal_field(|j| j.name.as_str());
        let journal = if italic {
            format!("<i>{}</i>", journal)
        } else {
            journal.to_string()
        };

        format!(
            "{} ({}). {}. {}, {}({}), {}. {}. {}{}",
            authors,
            self.year,
            self.title,
            journal,
            self.journal_field(|j| j.volume.as_str()),
            self.journal_field(|j| j.issue.as_str()),
            self.pages(),
            self.journal_field(|j| j.publisher.as_str()),
            DOI_RESOLVER,
            self.doi.as_deref().unwrap_or(""),
        )
    }
}

// === Service ===

/// Load state of the citation record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CitationState {
    #[default]
    Pending,
    Loaded(CitationRecord),
    Failed(String),
}

/// A downloadable `.bib` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibFile {
    pub file_name: String,
    pub content: String,
}

/// Owns the citation record and gates every action on it being loaded.
#[derive(Debug, Clone)]
pub struct CitationService {
    key: String,
    state: CitationState,
}

impl CitationService {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            state: CitationState::Pending,
        }
    }

    pub fn state(&self) -> &CitationState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, CitationState::Loaded(_))
    }

    /// Store the outcome of the citation fetch. A failure is logged and leaves
    /// the record unavailable for the rest of the session.
    pub fn resolve(&mut self, outcome: Result<CitationRecord>) {
        self.state = match outcome {
            Ok(record) => {
                info!(title = %record.title, authors = record.authors.len(), "Citation loaded");
                CitationState::Loaded(record)
            }
            Err(e) => {
                error!(error = %e, "Error loading CITATION.cff");
                CitationState::Failed(e.to_string())
            }
        };
    }

    pub fn record(&self) -> Result<&CitationRecord> {
        match &self.state {
            CitationState::Loaded(record) => Ok(record),
            CitationState::Pending | CitationState::Failed(_) => Err(PaperlensError::CitationNotLoaded),
        }
    }

    pub fn bibtex_file(&self) -> Result<BibFile> {
        let record = self.record()?;
        Ok(BibFile {
            file_name: format!("{}.bib", self.key),
            content: record.to_bibtex(&self.key),
        })
    }

    /// Reference string for the citation dialog (journal in italics).
    pub fn reference_html(&self) -> Result<String> {
        Ok(self.record()?.to_reference(true))
    }

    /// Reference string as copied to the clipboard.
    pub fn reference_text(&self) -> Result<String> {
        Ok(self.record()?.to_reference(false))
    }
}

impl Default for CitationService {
    fn default() -> Self {
        Self::new(DEFAULT_CITATION_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CFF: &str = r#"
cff-version: 1.2.0
title: LLM papers dataset
url: https://example.org/papers
preferred-citation:
  type: article
  title: A Survey of Things
  year: 2026
  doi: 10.1234/abcd
  authors:
    - given-names: Ana
      family-names: Augusto
      orcid: https://orcid.org/0000-0000-0000-0001
    - given-names: Bruno
      family-names: Silva
    - given-names: Carla
      family-names: Costa
  journal:
    name: Journal of Surveys
    volume: 12
    issue: 3
    pages:
      start: 101
      end: 120
    publisher: Example Press
"#;

    #[test]
    fn test_from_cff() -> Result<()> {
        let record = CitationRecord::from_cff(CFF)?;
        assert_eq!(record.authors.len(), 3);
        assert_eq!(record.authors[0].orcid.as_deref(), Some("https://orcid.org/0000-0000-0000-0001"));
        assert_eq!(record.authors[1].orcid, None);
        assert_eq!(record.year, "2026");
        assert_eq!(record.url.as_deref(), Some("https://example.org/papers"));
        let journal = record.journal.as_ref().ok_or(PaperlensError::NotFound("journal".into()))?;
        assert_eq!(journal.volume, "12");
        assert_eq!(record.pages(), "101-120");
        Ok(())
    }

    #[test]
    fn test_missing_preferred_citation() {
        assert!(matches!(
            CitationRecord::from_cff("cff-version: 1.2.0\n"),
            Err(PaperlensError::Validation(_))
        ));
    }

    #[test]
    fn test_bibtex() -> Result<()> {
        let record = CitationRecord::from_cff(CFF)?;
        let bib = record.to_bibtex("Augusto2026");
        assert!(bib.starts_with("@article{Augusto2026,\n"));
        assert!(bib.contains("  author    = {Augusto, Ana and Silva, Bruno and Costa, Carla},\n"));
        assert!(bib.contains("  number    = {3},\n"));
        assert!(bib.contains("  pages     = {101-120},\n"));
        assert!(bib.ends_with("  doi       = {10.1234/abcd}\n}\n"));
        assert!(!bib.contains(';'));
        assert_eq!(bib, record.to_bibtex("Augusto2026"));
        Ok(())
    }

    #[test]
    fn test_reference() -> Result<()> {
        let record = CitationRecord::from_cff(CFF)?;
        assert_eq!(
            record.to_reference(true),
            "Augusto, A., Silva, B., & Costa, C. (2026). A Survey of Things. \
             <i>Journal of Surveys</i>, 12(3), 101-120. Example Press. https://doi.org/10.1234/abcd"
        );
        assert_eq!(
            record.to_reference(false),
            "Augusto, A., Silva, B., & Costa, C. (2026). A Survey of Things. \
             Journal of Surveys, 12(3), 101-120. Example Press. https://doi.org/10.1234/abcd"
        );
        Ok(())
    }

    #[test]
    fn test_reference_single_author() -> Result<()> {
        let mut record = CitationRecord::from_cff(CFF)?;
        record.authors.truncate(1);
        assert!(record.to_reference(false).starts_with("Augusto, A. (2026)."));
        Ok(())
    }

    #[test]
    fn test_service_guards_until_loaded() -> Result<()> {
        let mut service = CitationService::default();
        assert!(matches!(service.bibtex_file(), Err(PaperlensError::CitationNotLoaded)));
        assert!(matches!(service.reference_html(), Err(PaperlensError::CitationNotLoaded)));

        service.resolve(Err(PaperlensError::Config("offline".into())));
        assert!(matches!(service.state(), CitationState::Failed(_)));
        assert!(matches!(service.reference_text(), Err(PaperlensError::CitationNotLoaded)));

        service.resolve(CitationRecord::from_cff(CFF));
        let file = service.bibtex_file()?;
        assert_eq!(file.file_name, "Augusto2026.bib");
        assert!(file.content.starts_with("@article{Augusto2026,"));
        Ok(())
    }
}
