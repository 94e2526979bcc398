use scraper::{ElementRef, Html, Selector};

use crate::{
    config::{PlatformProfile, SenderSource},
    domain::ExtractionResult,
};

use super::{compile, text::rendered_text, ExtractionError, ExtractionStrategy};

/// Reads the tail of an open chat conversation on a known web chat client.
pub struct PlatformStrategy {
    name: String,
    host_pattern: String,
    container: Option<Selector>,
    message: Selector,
    bubble: Option<Selector>,
    text: Selector,
    sender: Selector,
    sender_source: SenderSource,
    fallback_sender: String,
    message_cap: usize,
}

impl PlatformStrategy {
    pub fn new(profile: &PlatformProfile, message_cap: usize) -> Result<Self, ExtractionError> {
        Ok(Self {
            name: profile.name.clone(),
            host_pattern: profile.host_pattern.clone(),
            container: profile.container.as_deref().map(compile).transpose()?,
            message: compile(&profile.message)?,
            bubble: profile.bubble.as_deref().map(compile).transpose()?,
            text: compile(&profile.text)?,
            sender: compile(&profile.sender)?,
            sender_source: profile.sender_source.clone(),
            fallback_sender: profile.fallback_sender.clone(),
            message_cap,
        })
    }

    fn message_text(&self, message: ElementRef<'_>) -> Option<String> {
        let node = match &self.bubble {
            Some(bubble) => message.select(bubble).next()?,
            None => message,
        };
        let text = match node.select(&self.text).next() {
            Some(copyable) => rendered_text(copyable),
            None => rendered_text(node),
        };
        Some(text)
    }

    fn resolve_sender(&self, document: &Html) -> String {
        document
            .select(&self.sender)
            .next()
            .and_then(|header| match &self.sender_source {
                SenderSource::Attribute(name) => {
                    header.value().attr(name).map(|v| v.trim().to_string())
                }
                SenderSource::Text => Some(rendered_text(header)),
            })
            .filter(|sender| !sender.is_empty())
            .unwrap_or_else(|| self.fallback_sender.clone())
    }
}

impl ExtractionStrategy for PlatformStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches_host(&self, host: &str) -> bool {
        host.contains(&self.host_pattern)
    }

    fn try_extract(&self, document: &Html) -> Result<Option<ExtractionResult>, ExtractionError> {
        let root = match &self.container {
            Some(container) => match document.select(container).next() {
                Some(element) => element,
                None => return Ok(None),
            },
            None => document.root_element(),
        };

        let found: Vec<ElementRef<'_>> = root.select(&self.message).collect();
        let tail = &found[found.len().saturating_sub(self.message_cap)..];
        let messages: Vec<String> = tail
            .iter()
            .filter_map(|message| self.message_text(*message))
            .filter(|text| !text.trim().is_empty())
            .collect();

        tracing::debug!(
            target: "extract",
            platform = %self.name,
            found = found.len(),
            kept = messages.len(),
            "chat messages collected"
        );

        if messages.is_empty() {
            return Ok(None);
        }

        Ok(Some(ExtractionResult {
            sender: self.resolve_sender(document),
            content: messages.join("\n"),
        }))
    }
}
