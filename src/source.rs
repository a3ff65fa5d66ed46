//! Static resource locations.
//!
//! The dataset and the citation metadata are plain files next to the site.
//! They may also live behind an HTTP(S) URL, in which case they are fetched
//! once with `reqwest`. There is no retry and no timeout beyond the client's.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// Where a static resource is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    Path(PathBuf),
    Url(Url),
}

impl Source {
    /// Interpret `location` as an http(s) URL if it parses as one, otherwise as a path.
    pub fn parse(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Source::Url(url),
            _ => Source::Path(PathBuf::from(location)),
        }
    }

    /// Read the whole resource as UTF-8 text.
    pub async fn fetch_text(&self) -> Result<String> {
        debug!(source = %self, "Fetching resource");
        match self {
            Source::Path(path) => Ok(tokio::fs::read_to_string(path).await?),
            Source::Url(url) => {
                let text = reqwest::get(url.clone())
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                Ok(text)
            }
        }
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Source::parse(&s)
    }
}

impl From<Source> for String {
    fn from(s: Source) -> Self {
        s.to_string()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => write!(f, "{}", path.display()),
            Source::Url(url) => write!(f, "{}", url),
        }
    }
}
