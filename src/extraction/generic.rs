use scraper::{Html, Selector};

use crate::domain::ExtractionResult;

use super::{
    compile,
    text::{char_len, rendered_text},
    ExtractionError, ExtractionStrategy,
};

/// Webmail reading panes and other main-content regions: the longest region
/// wins, ties go to the earlier selector.
pub struct GenericStrategy {
    regions: Vec<Selector>,
    senders: Vec<Selector>,
    default_sender: String,
}

impl GenericStrategy {
    pub fn new(
        regions: &[String],
        senders: &[String],
        default_sender: &str,
    ) -> Result<Self, ExtractionError> {
        Ok(Self {
            regions: regions.iter().map(|s| compile(s)).collect::<Result<_, _>>()?,
            senders: senders.iter().map(|s| compile(s)).collect::<Result<_, _>>()?,
            default_sender: default_sender.to_string(),
        })
    }

    fn main_content(&self, document: &Html) -> String {
        let mut longest = String::new();
        for region in &self.regions {
            if let Some(element) = document.select(region).next() {
                let text = rendered_text(element);
                if char_len(&text) > char_len(&longest) {
                    longest = text;
                }
            }
        }
        longest
    }

    fn sender(&self, document: &Html) -> String {
        self.senders
            .iter()
            .filter_map(|selector| document.select(selector).next())
            .map(rendered_text)
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| self.default_sender.clone())
    }
}

impl ExtractionStrategy for GenericStrategy {
    fn name(&self) -> &str {
        "generic"
    }

    fn matches_host(&self, _host: &str) -> bool {
        true
    }

    fn try_extract(&self, document: &Html) -> Result<Option<ExtractionResult>, ExtractionError> {
        Ok(Some(ExtractionResult {
            sender: self.sender(document),
            content: self.main_content(document),
        }))
    }
}
