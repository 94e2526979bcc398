use anyhow::{Context, Result};
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::{
    config::env::RelayConfig,
    domain::{AnalysisRequest, AnalysisResult, HealthReport, RelayResponse},
};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("Backend reachable but returned error {0}")]
    Status(u16),
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

/// Talks to the classification service. One attempt per call; failures are
/// folded into [`RelayResponse::Error`].
#[derive(Clone)]
pub struct RelayClient {
    http: Client,
    analyze_url: Url,
    health_url: Url,
}

impl RelayClient {
    pub fn new(http: Client, config: &RelayConfig) -> Result<Self> {
        let mut base = config.endpoint.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http,
            analyze_url: base.join("analyze").context("failed to build analyze url")?,
            health_url: base.join("health").context("failed to build health url")?,
        })
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> RelayResponse {
        match self.post_analyze(request).await {
            Ok(result) => {
                tracing::info!(
                    target: "relay",
                    risk_score = ?result.risk_score,
                    category = %result.category,
                    "analysis success"
                );
                RelayResponse::Success { result }
            }
            Err(err) => {
                tracing::error!(target: "relay", error = %err, url = %self.analyze_url, "analysis failed");
                RelayResponse::error(err.to_string())
            }
        }
    }

    async fn post_analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, RelayError> {
        let response = self
            .http
            .post(self.analyze_url.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        Ok(AnalysisResult::from_body(value)?)
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let report = self
            .http
            .get(self.health_url.clone())
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.health_url))?
            .error_for_status()?
            .json::<HealthReport>()
            .await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn client(base: &str) -> RelayClient {
        let config = RelayConfig {
            endpoint: Url::parse(base).unwrap(),
        };
        RelayClient::new(Client::new(), &config).unwrap()
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            sender: "A".into(),
            content: "B".into(),
        }
    }

    #[tokio::test]
    async fn success_wraps_the_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/analyze")
                .json_body(json!({"sender": "A", "content": "B"}));
            then.status(200).json_body(json!({
                "risk_score": 90,
                "risk_level": "High",
                "category": "Phishing",
                "sentiment": "Urgent",
                "explanation": "Asks for credentials",
                "recommended_action": "Do not reply"
            }));
        });

        let response = client(&server.base_url()).analyze(&request()).await;
        mock.assert();
        match response {
            RelayResponse::Success { result } => {
                assert_eq!(result.risk_score, Some(90.0));
                assert_eq!(result.recommended_action, "Do not reply");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_names_the_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/analyze");
            then.status(500).body("Analysis failed");
        });

        match client(&server.base_url()).analyze(&request()).await {
            RelayResponse::Error { message } => assert!(message.contains("500"), "{message}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200).body("<html>proxy login</html>");
        });

        let response = client(&server.base_url()).analyze(&request()).await;
        assert!(matches!(response, RelayResponse::Error { .. }));
    }

    #[tokio::test]
    async fn any_json_shape_is_a_success() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200).json_body(json!([1, 2]));
        });

        match client(&server.base_url()).analyze(&request()).await {
            RelayResponse::Success { result } => {
                assert_eq!(result.risk_score, None);
                assert_eq!(result.extra.get("body"), Some(&json!([1, 2])));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let response = client("http://127.0.0.1:9").analyze(&request()).await;
        match response {
            RelayResponse::Error { message } => assert!(!message.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn endpoint_path_is_preserved() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/scamsense/health");
            then.status(200).json_body(json!({
                "status": "healthy",
                "service": "ScamSense Backend",
                "model_loaded": true,
                "error": null
            }));
        });

        let report = client(&server.url("/scamsense")).health().await.unwrap();
        mock.assert();
        assert!(report.model_loaded);
        assert_eq!(report.status, "healthy");
    }
}
