use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// What the page context hands to the relay: the best guess at who wrote the
/// visible conversation and its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub sender: String,
    pub content: String,
}

impl ExtractionResult {
    pub fn empty(default_sender: &str) -> Self {
        Self {
            sender: default_sender.to_string(),
            content: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    pub sender: String,
    pub content: String,
}

impl From<ExtractionResult> for AnalysisRequest {
    fn from(data: ExtractionResult) -> Self {
        let sender = if data.sender.is_empty() {
            "Unknown".to_string()
        } else {
            data.sender
        };
        Self {
            sender,
            content: data.content,
        }
    }
}

/// Classifier verdict. Fields are read leniently: a missing or oddly typed
/// value becomes empty rather than failing the whole response, and anything
/// the classifier adds is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(
        default,
        deserialize_with = "lenient_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub risk_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub risk_level: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sentiment: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub explanation: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub recommended_action: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const CONVERSATIONAL_CATEGORY: &str = "Conversational Message";

impl AnalysisResult {
    pub fn is_conversational(&self) -> bool {
        self.category == CONVERSATIONAL_CATEGORY
    }

    pub fn meets(&self, threshold: f64) -> bool {
        self.risk_score.is_some_and(|score| score >= threshold)
    }

    /// Reads a 2xx classifier body. Objects are read field by field; any other
    /// JSON value is kept verbatim under `extra["body"]`.
    pub fn from_body(body: Value) -> Result<Self, serde_json::Error> {
        match body {
            Value::Object(_) => serde_json::from_value(body),
            other => {
                let mut extra = Map::new();
                extra.insert("body".to_string(), other);
                Ok(Self {
                    extra,
                    ..Self::default()
                })
            }
        }
    }

    pub fn score_label(&self) -> String {
        self.risk_score
            .map(|score| score.to_string())
            .unwrap_or_else(|| "?".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RelayResponse {
    Success { result: AnalysisResult },
    Error { message: String },
}

impl RelayResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub error: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relay_response_is_tagged_on_status() {
        let response: RelayResponse = serde_json::from_value(json!({
            "status": "success",
            "result": {"risk_score": 90, "risk_level": "high", "category": "Phishing"}
        }))
        .unwrap();
        match response {
            RelayResponse::Success { result } => {
                assert_eq!(result.risk_score, Some(90.0));
                assert_eq!(result.category, "Phishing");
                assert_eq!(result.sentiment, "");
            }
            other => panic!("unexpected {other:?}"),
        }

        let error = serde_json::to_value(RelayResponse::error("boom")).unwrap();
        assert_eq!(error, json!({"status": "error", "message": "boom"}));
    }

    #[test]
    fn analysis_result_tolerates_odd_shapes() {
        let result: AnalysisResult = serde_json::from_value(json!({
            "risk_score": "42",
            "category": 7,
            "explanation": null,
            "confidence": 0.3
        }))
        .unwrap();
        assert_eq!(result.risk_score, Some(42.0));
        assert_eq!(result.category, "7");
        assert_eq!(result.explanation, "");
        assert_eq!(result.extra.get("confidence"), Some(&json!(0.3)));
        assert!(result.meets(25.0));
        assert!(!result.meets(85.0));
    }

    #[test]
    fn non_object_body_is_kept_as_is() {
        let result = AnalysisResult::from_body(json!(["spam", 0.97])).unwrap();
        assert_eq!(result.risk_score, None);
        assert_eq!(result.extra.get("body"), Some(&json!(["spam", 0.97])));
        assert!(!result.meets(25.0));

        let result = AnalysisResult::from_body(json!({"risk_score": 12})).unwrap();
        assert_eq!(result.risk_score, Some(12.0));
        assert!(result.extra.is_empty());
    }

    #[test]
    fn blank_sender_is_sent_as_unknown() {
        let request = AnalysisRequest::from(ExtractionResult {
            sender: String::new(),
            content: "hello there".into(),
        });
        assert_eq!(request.sender, "Unknown");
    }
}
