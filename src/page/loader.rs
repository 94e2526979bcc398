use reqwest::Client;
use url::Url;

use crate::config::env::PageConfig;

use super::{PageLoadError, PageSnapshot};

/// Loads a page over HTTP so it can be scanned without a browser.
pub struct PageLoader {
    client: Client,
    config: PageConfig,
}

impl PageLoader {
    pub fn new(client: Client, config: PageConfig) -> Self {
        Self { client, config }
    }

    pub async fn fetch(&self, raw_url: &str) -> Result<PageSnapshot, PageLoadError> {
        let url = match Url::parse(raw_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => return Err(PageLoadError::InvalidUrl(raw_url.to_string())),
        };

        let response = self
            .client
            .get(url.clone())
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .map_err(|source| PageLoadError::Fetch {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(PageLoadError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| PageLoadError::Fetch {
                url: url.clone(),
                source,
            })?;
        tracing::info!(target: "page", url = %url, bytes = body.len(), "page fetched");
        PageSnapshot::inline(url.as_str(), body)
    }
}
