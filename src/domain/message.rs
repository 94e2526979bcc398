use serde::{Deserialize, Serialize};

use super::types::{AnalysisResult, ExtractionResult};

/// Messages exchanged between the popup, page and background contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuntimeMessage {
    AnalyzeContent { data: ExtractionResult },
    ScanManual,
}

impl RuntimeMessage {
    pub fn action(&self) -> &'static str {
        match self {
            RuntimeMessage::AnalyzeContent { .. } => "analyzeContent",
            RuntimeMessage::ScanManual => "scanManual",
        }
    }
}

/// Reply of the page context to `scanManual`. `status` stays a plain string so
/// a reply the popup does not understand can still be echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReply {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    AlertShown,
    LowRisk,
    NoContent,
    Error,
    Unknown,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::AlertShown => "alert_shown",
            ScanStatus::LowRisk => "low_risk",
            ScanStatus::NoContent => "no_content",
            ScanStatus::Error => "error",
            ScanStatus::Unknown => "unknown",
        }
    }
}

impl ScanReply {
    fn with_status(status: ScanStatus) -> Self {
        Self {
            status: status.as_str().to_string(),
            risk: None,
            level: None,
            category: None,
            message: None,
        }
    }

    /// Casual conversation is never escalated to an alert, whatever its score.
    pub fn analysed(result: &AnalysisResult, report_threshold: f64) -> Self {
        let status = if result.meets(report_threshold) && !result.is_conversational() {
            ScanStatus::AlertShown
        } else {
            ScanStatus::LowRisk
        };
        Self {
            risk: result.risk_score,
            level: Some(result.risk_level.clone()),
            category: Some(result.category.clone()),
            ..Self::with_status(status)
        }
    }

    pub fn no_content() -> Self {
        Self::with_status(ScanStatus::NoContent)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::with_status(ScanStatus::Error)
        }
    }

    pub fn kind(&self) -> ScanStatus {
        match self.status.as_str() {
            "alert_shown" => ScanStatus::AlertShown,
            "low_risk" => ScanStatus::LowRisk,
            "no_content" => ScanStatus::NoContent,
            "error" => ScanStatus::Error,
            _ => ScanStatus::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn runtime_messages_use_action_tags() {
        let scan = serde_json::to_value(RuntimeMessage::ScanManual).unwrap();
        assert_eq!(scan, json!({"action": "scanManual"}));

        let analyze: RuntimeMessage = serde_json::from_value(json!({
            "action": "analyzeContent",
            "data": {"sender": "A", "content": "B"}
        }))
        .unwrap();
        assert_eq!(analyze.action(), "analyzeContent");
    }

    #[test]
    fn analysed_reply_pivots_on_report_threshold() {
        let mut result = AnalysisResult {
            risk_score: Some(25.0),
            ..Default::default()
        };
        assert_eq!(ScanReply::analysed(&result, 25.0).kind(), ScanStatus::AlertShown);
        result.risk_score = Some(24.9);
        assert_eq!(ScanReply::analysed(&result, 25.0).kind(), ScanStatus::LowRisk);
    }

    #[test]
    fn conversational_results_stay_low_risk() {
        let result = AnalysisResult {
            risk_score: Some(30.0),
            risk_level: "low".into(),
            category: "Conversational Message".into(),
            ..Default::default()
        };
        let reply = ScanReply::analysed(&result, 25.0);
        assert_eq!(reply.kind(), ScanStatus::LowRisk);
        assert_eq!(reply.category.as_deref(), Some("Conversational Message"));
    }

    #[test]
    fn unrecognised_status_is_unknown() {
        let reply: ScanReply = serde_json::from_value(json!({"status": "rate_limited"})).unwrap();
        assert_eq!(reply.kind(), ScanStatus::Unknown);
        assert_eq!(reply.status, "rate_limited");
    }
}
