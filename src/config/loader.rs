use std::{env, str::FromStr, time::Duration};

use url::Url;

use super::env::{
    AppConfig, ConfigError, DirectoryConfig, ExtractionConfig, LoggingConfig, OverlayConfig,
    PageConfig, RelayConfig, Thresholds,
};

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_endpoint =
            env::var("SCAMSENSE_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let endpoint = Url::parse(&raw_endpoint)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or(ConfigError::Invalid {
                key: "SCAMSENSE_ENDPOINT",
                value: raw_endpoint.clone(),
            })?;

        let defaults = Thresholds::default();
        let thresholds = Thresholds {
            report: parse_or("REPORT_THRESHOLD", defaults.report)?,
            severe: parse_or("SEVERE_THRESHOLD", defaults.severe)?,
            min_content_chars: parse_or("MIN_CONTENT_LENGTH", defaults.min_content_chars)?,
        };

        let overlay = OverlayConfig {
            dismiss_after: Duration::from_secs(parse_or("OVERLAY_DISMISS_SECS", 60u64)?),
        };

        let mut extraction = ExtractionConfig::default();
        extraction.message_cap = parse_or("MESSAGE_CAP", extraction.message_cap)?;
        if let Some(sender) = env::var("DEFAULT_SENDER").ok().filter(|v| !v.is_empty()) {
            extraction.default_sender = sender;
        }

        let page = PageConfig {
            fetch_timeout: Duration::from_millis(parse_or("PAGE_FETCH_TIMEOUT", 10_000u64)?),
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            relay: RelayConfig { endpoint },
            thresholds,
            overlay,
            extraction,
            page,
            directories,
            logging,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            relay: RelayConfig {
                endpoint: Url::parse(DEFAULT_ENDPOINT).expect("valid default endpoint"),
            },
            thresholds: Thresholds::default(),
            overlay: OverlayConfig::default(),
            extraction: ExtractionConfig::default(),
            page: PageConfig {
                fetch_timeout: Duration::from_millis(10_000),
            },
            directories: DirectoryConfig {
                logs_dir: "logs".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}
