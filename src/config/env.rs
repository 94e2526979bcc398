use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub relay: RelayConfig,
    pub thresholds: Thresholds,
    pub overlay: OverlayConfig,
    pub extraction: ExtractionConfig,
    pub page: PageConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base address of the classification service; `/analyze` and `/health` hang off it.
    pub endpoint: Url,
}

#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// Scores at or above this are reported to the popup as an alert.
    pub report: f64,
    /// Scores at or above this switch the overlay to the high-severity accent.
    pub severe: f64,
    /// Extracted content shorter than this is treated as "no content".
    pub min_content_chars: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            report: 25.0,
            severe: 85.0,
            min_content_chars: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub dismiss_after: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            dismiss_after: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub default_sender: String,
    pub message_cap: usize,
    /// Evaluated in order; the first host match is the only one attempted.
    pub platforms: Vec<PlatformProfile>,
    pub region_selectors: Vec<String>,
    pub sender_selectors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PlatformProfile {
    pub name: String,
    pub host_pattern: String,
    /// Active conversation container. `None` searches the whole document.
    pub container: Option<String>,
    pub message: String,
    /// When set, a message yields text only if it contains a matching bubble.
    pub bubble: Option<String>,
    pub text: String,
    pub sender: String,
    pub sender_source: SenderSource,
    pub fallback_sender: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderSource {
    Attribute(String),
    Text,
}

impl PlatformProfile {
    pub fn whatsapp() -> Self {
        Self {
            name: "WhatsApp".into(),
            host_pattern: "web.whatsapp.com".into(),
            container: Some("#main".into()),
            message: "div[role='row']".into(),
            bubble: Some(".message-in, .message-out".into()),
            text: ".copyable-text span".into(),
            sender: "header [title]".into(),
            sender_source: SenderSource::Attribute("title".into()),
            fallback_sender: "WhatsApp Contact".into(),
        }
    }

    pub fn telegram() -> Self {
        Self {
            name: "Telegram".into(),
            host_pattern: "web.telegram.org".into(),
            container: None,
            message: ".Message, .message, .bubble".into(),
            bubble: None,
            text: ".text-content, .message-text".into(),
            sender: ".chat-info .title, .chat-title, .top .peer-title".into(),
            sender_source: SenderSource::Text,
            fallback_sender: "Telegram Contact".into(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_sender: "Detected Message".into(),
            message_cap: 15,
            platforms: vec![PlatformProfile::whatsapp(), PlatformProfile::telegram()],
            region_selectors: [
                ".allowTextSelection",
                "#readPane_content_container",
                "[role='main']",
                ".a3s",
                ".gs",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            sender_selectors: [
                "span.gD",
                "[data-name]",
                ".C_Oka",
                ".G3",
                ".owR",
                "header [title]",
                "span[email]",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ExtractionConfig {
    pub fn is_chat_host(&self, url_or_host: &str) -> bool {
        self.platforms
            .iter()
            .any(|platform| url_or_host.contains(&platform.host_pattern))
    }
}

#[derive(Debug, Clone)]
pub struct PageConfig {
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
