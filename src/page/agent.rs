use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    bridge::{Envelope, Inbox, Port},
    config::Thresholds,
    domain::{ExtractionResult, RelayResponse, RuntimeMessage, ScanReply},
    extraction::{text::char_len, Extractor},
    infrastructure::shutdown::ShutdownListener,
    presenter::overlay::OverlaySlot,
    relay::RelayPort,
};

use super::PageSnapshot;

pub type PagePort = Port<RuntimeMessage, ScanReply>;
pub type PageInbox = Inbox<RuntimeMessage, ScanReply>;

const INTERNAL_ERROR: &str = "Internal communication error";

/// Listener injected into a page: answers `scanManual` by extracting the
/// conversation, asking the relay for a verdict and showing the overlay.
pub struct PageAgent {
    page: PageSnapshot,
    extractor: Arc<Extractor>,
    relay: RelayPort,
    overlay: Arc<OverlaySlot>,
    thresholds: Thresholds,
}

impl PageAgent {
    pub fn new(
        page: PageSnapshot,
        extractor: Arc<Extractor>,
        relay: RelayPort,
        overlay: Arc<OverlaySlot>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            page,
            extractor,
            relay,
            overlay,
            thresholds,
        }
    }

    pub fn spawn(self: Arc<Self>, mut inbox: PageInbox, mut shutdown: ShutdownListener) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(target: "page", host = %self.page.host(), "page listener loaded");
            loop {
                let envelope = tokio::select! {
                    received = inbox.recv() => match received {
                        Some(envelope) => envelope,
                        None => break,
                    },
                    _ = shutdown.notified() => break,
                };
                self.dispatch(envelope);
            }
            tracing::info!(target: "page", host = %self.page.host(), "page listener stopped");
        })
    }

    fn dispatch(self: &Arc<Self>, envelope: Envelope<RuntimeMessage, ScanReply>) {
        if envelope.message != RuntimeMessage::ScanManual {
            tracing::debug!(target: "page", action = envelope.message.action(), "ignoring message");
            return;
        }
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            let reply = agent.scan().await;
            envelope.respond(reply);
        });
    }

    pub async fn scan(&self) -> ScanReply {
        let data = self.extract().await;
        if char_len(&data.content) < self.thresholds.min_content_chars {
            tracing::info!(target: "page", content_len = char_len(&data.content), "no content to scan");
            return ScanReply::no_content();
        }

        match self
            .relay
            .request(RuntimeMessage::AnalyzeContent { data })
            .await
        {
            Ok(Some(RelayResponse::Success { result })) => {
                self.overlay.show(&result);
                ScanReply::analysed(&result, self.thresholds.report)
            }
            Ok(Some(RelayResponse::Error { message })) if !message.is_empty() => {
                ScanReply::error(message)
            }
            Ok(_) => ScanReply::error(INTERNAL_ERROR),
            Err(err) => {
                tracing::error!(target: "page", error = %err, "relay unavailable");
                ScanReply::error(INTERNAL_ERROR)
            }
        }
    }

    /// Parsing happens off the async workers; a failed extraction task counts
    /// as an empty page.
    async fn extract(&self) -> ExtractionResult {
        let extractor = Arc::clone(&self.extractor);
        let page = self.page.clone();
        match tokio::task::spawn_blocking(move || extractor.extract(&page)).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(target: "page", error = %err, "extraction task failed");
                ExtractionResult::empty("")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        bridge,
        config::{ExtractionConfig, OverlayConfig},
        domain::AnalysisResult,
        infrastructure::shutdown::Shutdown,
        relay::service::RelayInbox,
    };

    struct Harness {
        agent: Arc<PageAgent>,
        overlay: Arc<OverlaySlot>,
        relay_inbox: RelayInbox,
    }

    fn harness(url: &str, html: &str) -> Harness {
        let extractor = Arc::new(Extractor::from_config(&ExtractionConfig::default()).unwrap());
        let (relay, relay_inbox) = bridge::channel(4);
        let overlay = OverlaySlot::new(&OverlayConfig::default(), 85.0);
        let agent = Arc::new(PageAgent::new(
            PageSnapshot::inline(url, html).unwrap(),
            extractor,
            relay,
            Arc::clone(&overlay),
            Thresholds::default(),
        ));
        Harness {
            agent,
            overlay,
            relay_inbox,
        }
    }

    fn answer(mut inbox: RelayInbox, response: RelayResponse) -> tokio::task::JoinHandle<Option<RuntimeMessage>> {
        tokio::spawn(async move {
            let envelope = inbox.recv().await?;
            let message = envelope.message.clone();
            envelope.respond(response);
            Some(message)
        })
    }

    #[tokio::test]
    async fn nine_characters_is_no_content() {
        let h = harness("https://mail.google.com/", "<div class='a3s'>123456789</div>");
        let reply = h.agent.scan().await;
        assert_eq!(reply, ScanReply::no_content());
    }

    #[tokio::test]
    async fn ten_characters_goes_to_the_relay() {
        let h = harness("https://mail.google.com/", "<div class='a3s'>1234567890</div>");
        let relay = answer(
            h.relay_inbox,
            RelayResponse::Success {
                result: AnalysisResult {
                    risk_score: Some(10.0),
                    risk_level: "Low".into(),
                    category: "Notification".into(),
                    ..Default::default()
                },
            },
        );

        let reply = h.agent.scan().await;
        assert_eq!(reply.status, "low_risk");
        assert_eq!(reply.level.as_deref(), Some("Low"));

        let sent = relay.await.unwrap().unwrap();
        assert_eq!(
            sent,
            RuntimeMessage::AnalyzeContent {
                data: ExtractionResult {
                    sender: "Detected Message".into(),
                    content: "1234567890".into(),
                }
            }
        );
    }

    #[tokio::test]
    async fn success_shows_overlay_and_reports_alert() {
        let h = harness(
            "https://outlook.live.com/mail/",
            "<div id='readPane_content_container'>Your parcel is held, pay the fee now</div>",
        );
        answer(
            h.relay_inbox,
            RelayResponse::Success {
                result: AnalysisResult {
                    risk_score: Some(90.0),
                    category: "Delivery Scam".into(),
                    ..Default::default()
                },
            },
        );

        let reply = h.agent.scan().await;
        assert_eq!(reply.status, "alert_shown");
        assert_eq!(reply.risk, Some(90.0));
        assert!(h.overlay.current().is_some());
    }

    #[tokio::test]
    async fn relay_error_is_passed_through() {
        let h = harness("https://mail.google.com/", "<div class='a3s'>Please verify your account</div>");
        answer(h.relay_inbox, RelayResponse::error("Backend reachable but returned error 503"));

        let reply = h.agent.scan().await;
        assert_eq!(reply, ScanReply::error("Backend reachable but returned error 503"));
        assert!(h.overlay.current().is_none());
    }

    #[tokio::test]
    async fn missing_relay_is_internal_error() {
        let h = harness("https://mail.google.com/", "<div class='a3s'>Please verify your account</div>");
        drop(h.relay_inbox);
        assert_eq!(h.agent.scan().await, ScanReply::error(INTERNAL_ERROR));
    }

    #[tokio::test]
    async fn listener_answers_scan_manual_only() {
        let h = harness("https://mail.google.com/", "<p>short</p>");
        let (port, inbox) = bridge::channel(4);
        let (shutdown, _) = Shutdown::new();
        Arc::clone(&h.agent).spawn(inbox, shutdown.subscribe());

        let reply = tokio::time::timeout(Duration::from_secs(5), port.request(RuntimeMessage::ScanManual))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, Some(ScanReply::no_content()));

        let ignored = port
            .request(RuntimeMessage::AnalyzeContent {
                data: ExtractionResult::empty("x"),
            })
            .await
            .unwrap();
        assert!(ignored.is_none());
    }
}
