use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use futures::future::BoxFuture;

use crate::{
    bridge::BridgeError,
    config::ExtractionConfig,
    domain::{RuntimeMessage, ScanReply, ScanStatus, CONVERSATIONAL_CATEGORY},
    page::agent::PagePort,
};

const NO_RESPONSE: &str = "No response from page.";
const NEEDS_REFRESH: &str = "Page needs refresh (F5) to link with ScamSense.";
const NO_ACTIVE_TAB: &str = "No active tab";
const INTERNAL_ERROR: &str = "Internal communication error";

#[derive(Debug, Clone)]
pub struct ActiveTab {
    pub url: String,
    pub port: PagePort,
}

/// Asks the browser for the tab currently in focus.
pub trait TabQuery: Send + Sync {
    fn active_tab(&self) -> BoxFuture<'_, Option<ActiveTab>>;
}

/// A browser window with at most one tab in focus.
#[derive(Debug, Default)]
pub struct FocusedTab {
    tab: Option<ActiveTab>,
}

impl FocusedTab {
    pub fn new(tab: Option<ActiveTab>) -> Self {
        Self { tab }
    }
}

impl TabQuery for FocusedTab {
    fn active_tab(&self) -> BoxFuture<'_, Option<ActiveTab>> {
        Box::pin(async move { self.tab.clone() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupState {
    Idle,
    Scanning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    AlertShown,
    LowRisk {
        title: String,
        category: String,
        risk: Option<f64>,
        conversational: bool,
    },
    NoContent {
        hint: &'static str,
    },
    Error {
        message: String,
    },
    Unknown {
        status: String,
    },
}

impl ScanOutcome {
    pub fn status(&self) -> ScanStatus {
        match self {
            ScanOutcome::AlertShown => ScanStatus::AlertShown,
            ScanOutcome::LowRisk { .. } => ScanStatus::LowRisk,
            ScanOutcome::NoContent { .. } => ScanStatus::NoContent,
            ScanOutcome::Error { .. } => ScanStatus::Error,
            ScanOutcome::Unknown { .. } => ScanStatus::Unknown,
        }
    }

    pub fn status_line(&self) -> StatusLine {
        match self {
            ScanOutcome::AlertShown => StatusLine {
                headline: "THREAT DETECTED!".into(),
                details: vec!["Check bottom right for details.".into()],
                color: "#dc2626",
            },
            ScanOutcome::LowRisk {
                title,
                category,
                risk,
                conversational,
            } => StatusLine {
                headline: title.clone(),
                details: vec![
                    format!("Category: {category}"),
                    format!(
                        "Risk Score: {}%",
                        risk.map(|r| r.to_string()).unwrap_or_else(|| "?".into())
                    ),
                ],
                color: if *conversational { "#059669" } else { "#16a34a" },
            },
            ScanOutcome::NoContent { hint } => StatusLine {
                headline: "NO CONTENT".into(),
                details: vec![(*hint).to_string()],
                color: "#ea580c",
            },
            ScanOutcome::Error { message } => StatusLine {
                headline: "SYSTEM ERROR".into(),
                details: vec![message.clone()],
                color: "#dc2626",
            },
            ScanOutcome::Unknown { status } => StatusLine {
                headline: format!("Unknown status: {status}"),
                details: Vec::new(),
                color: "#6b7280",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub headline: String,
    pub details: Vec<String>,
    pub color: &'static str,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.headline)?;
        for detail in &self.details {
            write!(f, "\n{detail}")?;
        }
        Ok(())
    }
}

/// Re-enables the trigger however the scan ends.
struct TriggerGuard<'a>(&'a AtomicBool);

impl Drop for TriggerGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The popup's scan button and status region.
pub struct PopupController {
    tabs: Arc<dyn TabQuery>,
    extraction: Arc<ExtractionConfig>,
    scanning: AtomicBool,
}

impl PopupController {
    pub fn new(tabs: Arc<dyn TabQuery>, extraction: Arc<ExtractionConfig>) -> Self {
        Self {
            tabs,
            extraction,
            scanning: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> PopupState {
        if self.scanning.load(Ordering::SeqCst) {
            PopupState::Scanning
        } else {
            PopupState::Idle
        }
    }

    /// Runs one scan. Returns `None` when a scan is already in flight and the
    /// click was ignored.
    pub async fn on_scan_clicked(&self) -> Option<ScanOutcome> {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(target: "popup", "scan already running; click ignored");
            return None;
        }
        let _guard = TriggerGuard(&self.scanning);
        tracing::info!(target: "popup", "analyzing message");

        let outcome = self.run_scan().await;
        tracing::info!(target: "popup", status = outcome.status().as_str(), "scan finished");
        Some(outcome)
    }

    async fn run_scan(&self) -> ScanOutcome {
        let Some(tab) = self.tabs.active_tab().await else {
            return ScanOutcome::Error {
                message: NO_ACTIVE_TAB.into(),
            };
        };

        match tab.port.request(RuntimeMessage::ScanManual).await {
            Ok(Some(reply)) => self.interpret(&reply, &tab.url),
            Ok(None) => ScanOutcome::Error {
                message: NO_RESPONSE.into(),
            },
            Err(BridgeError::Disconnected) => {
                tracing::warn!(target: "popup", url = %tab.url, "page listener not loaded");
                ScanOutcome::Error {
                    message: NEEDS_REFRESH.into(),
                }
            }
        }
    }

    pub fn interpret(&self, reply: &ScanReply, tab_url: &str) -> ScanOutcome {
        match reply.kind() {
            ScanStatus::AlertShown => ScanOutcome::AlertShown,
            ScanStatus::LowRisk => {
                let category = reply.category.clone().unwrap_or_default();
                let conversational = category == CONVERSATIONAL_CATEGORY;
                let title = if conversational {
                    "CONVERSATIONAL".to_string()
                } else {
                    reply.level.as_deref().unwrap_or_default().to_uppercase()
                };
                ScanOutcome::LowRisk {
                    title,
                    category,
                    risk: reply.risk,
                    conversational,
                }
            }
            ScanStatus::NoContent => ScanOutcome::NoContent {
                hint: if self.extraction.is_chat_host(tab_url) {
                    "Please open a specific chat to scan."
                } else {
                    "Please select an email first."
                },
            },
            ScanStatus::Error => ScanOutcome::Error {
                message: reply
                    .message
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| INTERNAL_ERROR.into()),
            },
            ScanStatus::Unknown => ScanOutcome::Unknown {
                status: reply.status.clone(),
            },
        }
    }
}
