use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{config::OverlayConfig, domain::AnalysisResult};

pub const OVERLAY_ELEMENT_ID: &str = "scamsense-alert";
const SEVERE_ACCENT: &str = "#dc2626";
const MEDIUM_ACCENT: &str = "#f97316";

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub id: u64,
    pub html: String,
    pub shown_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct SlotState {
    next_id: u64,
    current: Option<Overlay>,
}

/// The single overlay a page can show. Showing always replaces whatever is
/// there; timers and close controls only remove the overlay they belong to.
#[derive(Debug)]
pub struct OverlaySlot {
    state: Mutex<SlotState>,
    dismiss_after: Duration,
    severe_threshold: f64,
}

impl OverlaySlot {
    pub fn new(config: &OverlayConfig, severe_threshold: f64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::default()),
            dismiss_after: config.dismiss_after,
            severe_threshold,
        })
    }

    /// Replaces the current overlay and arms its auto-dismiss timer. Must be
    /// called from within a tokio runtime.
    pub fn show(self: &Arc<Self>, result: &AnalysisResult) -> u64 {
        let accent = accent_for(result, self.severe_threshold);
        let id = {
            let mut state = self.state.lock();
            state.next_id += 1;
            let id = state.next_id;
            if let Some(previous) = state.current.take() {
                tracing::debug!(target: "overlay", previous = previous.id, "replacing overlay");
            }
            state.current = Some(Overlay {
                id,
                html: render(id, result, accent),
                shown_at: Utc::now(),
            });
            id
        };
        tracing::info!(target: "overlay", id, accent, "overlay shown");

        let slot = Arc::clone(self);
        let delay = self.dismiss_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if slot.dismiss(id) {
                tracing::debug!(target: "overlay", id, "overlay auto-dismissed");
            }
        });
        id
    }

    /// Close control. Returns whether anything was removed; a stale id is a no-op.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut state = self.state.lock();
        if state.current.as_ref().is_some_and(|overlay| overlay.id == id) {
            state.current = None;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<Overlay> {
        self.state.lock().current.clone()
    }

    /// Returns `page_html` with the current overlay appended to its body.
    pub fn inject_into(&self, page_html: &str) -> String {
        let Some(overlay) = self.current() else {
            return page_html.to_string();
        };
        match page_html.to_ascii_lowercase().rfind("</body>") {
            Some(index) => {
                let mut out = String::with_capacity(page_html.len() + overlay.html.len());
                out.push_str(&page_html[..index]);
                out.push_str(&overlay.html);
                out.push_str(&page_html[index..]);
                out
            }
            None => format!("{page_html}{}", overlay.html),
        }
    }
}

pub fn accent_for(result: &AnalysisResult, severe_threshold: f64) -> &'static str {
    if result.meets(severe_threshold) {
        SEVERE_ACCENT
    } else {
        MEDIUM_ACCENT
    }
}

fn render(id: u64, result: &AnalysisResult, accent: &str) -> String {
    format!(
        r#"<div id="{OVERLAY_ELEMENT_ID}" data-overlay-id="{id}" style="all: initial !important; position: fixed !important; bottom: 20px !important; right: 20px !important; width: 370px !important; max-width: calc(100vw - 40px) !important; max-height: calc(100vh - 40px) !important; z-index: 2147483647 !important; background-color: white !important; border-radius: 16px !important; box-shadow: 0 25px 50px -12px rgba(0, 0, 0, 0.5) !important; font-family: 'Segoe UI', Tahoma, sans-serif !important; overflow: hidden !important; display: flex !important; flex-direction: column !important; box-sizing: border-box !important; border: 1px solid #e5e7eb !important;">
  <div style="all: initial; background: {accent}; color: white; padding: 10px 15px; font-weight: 900; display: flex; justify-content: space-between; align-items: center; letter-spacing: 1px; font-family: 'Segoe UI', sans-serif; box-sizing: border-box; width: 100%;">
    <span style="font-size: 13px;">SCAMSENSE ALERT</span>
    <button data-scamsense-close="{id}" style="all: initial; color: white; font-size: 28px; cursor: pointer; padding: 5px; min-width: 36px; min-height: 36px; font-weight: bold; font-family: Arial, sans-serif;">&times;</button>
  </div>
  <div style="all: initial; padding: 15px; overflow-y: auto; display: block; font-family: 'Segoe UI', sans-serif; box-sizing: border-box; width: 100%;">
    <div style="display: flex; justify-content: space-between; align-items: center; margin-bottom: 12px;">
      <span style="font-size: 11px; font-weight: 700; color: #6b7280; text-transform: uppercase;">Risk Probability</span>
      <span style="font-size: 32px; font-weight: 900; color: {accent};">{score}%</span>
    </div>
    <div style="margin-bottom: 6px; font-size: 14px;"><strong>Type:</strong> {category}</div>
    <div style="margin-bottom: 6px; font-size: 14px;"><strong>Emotion:</strong> {sentiment}</div>
    <div style="height: 1px; background: #e5e7eb; margin: 10px 0;"></div>
    <div style="background: #f9fafb; padding: 12px; border-radius: 8px; border-left: 5px solid {accent}; font-size: 13px; color: #374151; line-height: 1.4; margin-bottom: 15px; max-height: 12em; overflow: hidden;">{explanation}</div>
    <div style="background: #111827; padding: 12px; border-radius: 8px; color: white; font-size: 13px; line-height: 1.4;">
      <strong style="color: {accent}; text-transform: uppercase; font-size: 11px; display: block; margin-bottom: 4px;">Recommended Action:</strong>
      {action}
    </div>
  </div>
</div>"#,
        score = escape_html(&result.score_label()),
        category = escape_html(&result.category),
        sentiment = escape_html(&result.sentiment),
        explanation = escape_html(&result.explanation),
        action = escape_html(&result.recommended_action),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
