//! Page-context extraction: turns the current document into an
//! [`ExtractionResult`] without touching the network.
//!
//! Site strategies are tried first (only the first one whose host pattern
//! matches), then the generic "longest reading pane" fallback. Extraction
//! never fails from the caller's point of view; errors are logged and an
//! empty result comes back instead.

mod generic;
mod platform;
pub mod text;

use std::time::Instant;

use scraper::{Html, Selector};
use thiserror::Error;

use crate::{
    config::ExtractionConfig,
    domain::ExtractionResult,
    page::{PageLoadError, PageSnapshot},
};

pub use generic::GenericStrategy;
pub use platform::PlatformStrategy;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },
    #[error("document unavailable: {0}")]
    Document(#[from] PageLoadError),
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn matches_host(&self, host: &str) -> bool;

    /// `Ok(None)` means "nothing here", which sends the caller to the next
    /// strategy rather than failing the scan.
    fn try_extract(&self, document: &Html) -> Result<Option<ExtractionResult>, ExtractionError>;
}

pub(crate) fn compile(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|err| ExtractionError::Selector {
        selector: selector.to_string(),
        reason: format!("{err:?}"),
    })
}

pub struct Extractor {
    platforms: Vec<Box<dyn ExtractionStrategy>>,
    fallback: Box<dyn ExtractionStrategy>,
    default_sender: String,
}

impl Extractor {
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let platforms = config
            .platforms
            .iter()
            .map(|profile| {
                PlatformStrategy::new(profile, config.message_cap)
                    .map(|strategy| Box::new(strategy) as Box<dyn ExtractionStrategy>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let fallback = GenericStrategy::new(
            &config.region_selectors,
            &config.sender_selectors,
            &config.default_sender,
        )?;
        Ok(Self {
            platforms,
            fallback: Box::new(fallback),
            default_sender: config.default_sender.clone(),
        })
    }

    pub fn extract(&self, page: &PageSnapshot) -> ExtractionResult {
        let started = Instant::now();
        tracing::debug!(target: "extract", host = %page.host(), "extraction started");

        let result = match self.run(page) {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(target: "extract", error = %err, host = %page.host(), "extraction error");
                ExtractionResult::empty(&self.default_sender)
            }
        };

        tracing::info!(
            target: "extract",
            elapsed_ms = started.elapsed().as_millis() as u64,
            content_len = text::char_len(&result.content),
            sender = %result.sender,
            "extraction finished"
        );
        result
    }

    fn run(&self, page: &PageSnapshot) -> Result<ExtractionResult, ExtractionError> {
        let raw = page.document()?;
        let document = Html::parse_document(&raw);
        let host = page.host();

        if let Some(platform) = self
            .platforms
            .iter()
            .find(|strategy| strategy.matches_host(host))
        {
            match platform.try_extract(&document)? {
                Some(result) if !result.content.is_empty() => return Ok(result),
                _ => tracing::debug!(
                    target: "extract",
                    platform = platform.name(),
                    "no conversation found; using generic fallback"
                ),
            }
        }

        Ok(self
            .fallback
            .try_extract(&document)?
            .unwrap_or_else(|| ExtractionResult::empty(&self.default_sender)))
    }
}
