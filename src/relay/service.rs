use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    bridge::{Envelope, Inbox, Port},
    domain::{AnalysisRequest, RelayResponse, RuntimeMessage},
    infrastructure::shutdown::ShutdownListener,
};

use super::client::RelayClient;

pub type RelayPort = Port<RuntimeMessage, RelayResponse>;
pub type RelayInbox = Inbox<RuntimeMessage, RelayResponse>;

/// Background-context listener: the only place that talks to the network on
/// behalf of a page.
pub struct RelayService {
    client: RelayClient,
}

impl RelayService {
    pub fn new(client: RelayClient) -> Self {
        Self { client }
    }

    pub fn spawn(self: Arc<Self>, inbox: RelayInbox, mut shutdown: ShutdownListener) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run_loop(inbox, &mut shutdown).await;
        })
    }

    async fn run_loop(self: &Arc<Self>, mut inbox: RelayInbox, shutdown: &mut ShutdownListener) {
        loop {
            if shutdown.is_triggered() {
                break;
            }
            let envelope = tokio::select! {
                received = inbox.recv() => match received {
                    Some(envelope) => envelope,
                    None => break,
                },
                _ = shutdown.notified() => break,
            };
            self.dispatch(envelope);
        }
        tracing::info!(target: "relay", "relay listener stopped");
    }

    fn dispatch(self: &Arc<Self>, envelope: Envelope<RuntimeMessage, RelayResponse>) {
        let Envelope { message, reply } = envelope;
        match message {
            RuntimeMessage::AnalyzeContent { data } => {
                tracing::info!(target: "relay", "received analysis request");
                let service = Arc::clone(self);
                tokio::spawn(async move {
                    let request = AnalysisRequest::from(data);
                    let response = service.client.analyze(&request).await;
                    if reply.send(response).is_err() {
                        tracing::debug!(target: "relay", "requester went away before the reply");
                    }
                });
            }
            other => {
                tracing::debug!(target: "relay", action = other.action(), "ignoring message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use reqwest::Client;
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::{
        bridge, config::env::RelayConfig, domain::ExtractionResult,
        infrastructure::shutdown::Shutdown,
    };

    fn start(base: &str) -> (RelayPort, Shutdown) {
        let config = RelayConfig {
            endpoint: Url::parse(base).unwrap(),
        };
        let client = RelayClient::new(Client::new(), &config).unwrap();
        let (port, inbox) = bridge::channel(8);
        let (shutdown, _) = Shutdown::new();
        Arc::new(RelayService::new(client)).spawn(inbox, shutdown.subscribe());
        (port, shutdown)
    }

    #[tokio::test]
    async fn analyze_content_round_trip() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/analyze")
                .json_body(json!({"sender": "Unknown", "content": "Claim your parcel"}));
            then.status(200)
                .json_body(json!({"risk_score": 70, "category": "Delivery Scam"}));
        });

        let (port, _shutdown) = start(&server.base_url());
        let reply = port
            .request(RuntimeMessage::AnalyzeContent {
                data: ExtractionResult {
                    sender: String::new(),
                    content: "Claim your parcel".into(),
                },
            })
            .await
            .unwrap();

        match reply {
            Some(RelayResponse::Success { result }) => assert_eq!(result.category, "Delivery Scam"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_actions_get_no_reply() {
        let (port, _shutdown) = start("http://127.0.0.1:9");
        let reply = port.request(RuntimeMessage::ScanManual).await.unwrap();
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn shutdown_stops_the_listener() {
        let (port, shutdown) = start("http://127.0.0.1:9");
        shutdown.trigger();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(
            port.request(RuntimeMessage::ScanManual).await,
            Err(crate::bridge::BridgeError::Disconnected)
        );
    }
}
