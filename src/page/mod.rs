pub mod agent;
pub mod loader;

use std::{fs, path::PathBuf};

use thiserror::Error;
use url::Url;

pub use agent::PageAgent;
pub use loader::PageLoader;

#[derive(Debug, Error)]
pub enum PageLoadError {
    #[error("invalid page url `{0}`")]
    InvalidUrl(String),
    #[error("page url `{0}` has no host")]
    MissingHost(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: Url, status: u16 },
}

#[derive(Debug, Clone)]
enum DocumentSource {
    Inline(String),
    /// Re-read on every scan so edits to the file behave like a live page.
    File(PathBuf),
}

/// The page a scan runs against: where it lives and how to read its current
/// document.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    url: Url,
    host: String,
    source: DocumentSource,
}

impl PageSnapshot {
    pub fn inline(url: &str, html: impl Into<String>) -> Result<Self, PageLoadError> {
        Self::new(url, DocumentSource::Inline(html.into()))
    }

    pub fn from_file(url: &str, path: impl Into<PathBuf>) -> Result<Self, PageLoadError> {
        Self::new(url, DocumentSource::File(path.into()))
    }

    fn new(url: &str, source: DocumentSource) -> Result<Self, PageLoadError> {
        let url = Url::parse(url).map_err(|_| PageLoadError::InvalidUrl(url.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| PageLoadError::MissingHost(url.to_string()))?
            .to_string();
        Ok(Self { url, host, source })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn document(&self) -> Result<String, PageLoadError> {
        match &self.source {
            DocumentSource::Inline(html) => Ok(html.clone()),
            DocumentSource::File(path) => {
                fs::read_to_string(path).map_err(|source| PageLoadError::Io {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_taken_from_the_url() {
        let page = PageSnapshot::inline("https://web.telegram.org/k/#@news", "").unwrap();
        assert_eq!(page.host(), "web.telegram.org");
    }

    #[test]
    fn urls_without_host_are_rejected() {
        assert!(matches!(
            PageSnapshot::inline("file:///tmp/mail.html", ""),
            Err(PageLoadError::MissingHost(_))
        ));
        assert!(matches!(
            PageSnapshot::inline("not a url", ""),
            Err(PageLoadError::InvalidUrl(_))
        ));
    }

    #[test]
    fn file_documents_are_read_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inbox.html");
        let page = PageSnapshot::from_file("https://outlook.live.com/mail/", &path).unwrap();
        assert!(page.document().is_err());

        fs::write(&path, "<div role='main'>hi</div>").unwrap();
        assert_eq!(page.document().unwrap(), "<div role='main'>hi</div>");
    }
}
