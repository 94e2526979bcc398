use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::{
    bridge,
    cli::PageArgs,
    config::AppConfig,
    domain::{ExtractionResult, HealthReport},
    extraction::Extractor,
    infrastructure::shutdown::Shutdown,
    page::{PageAgent, PageLoader, PageSnapshot},
    presenter::{ActiveTab, FocusedTab, OverlaySlot, PopupController, ScanOutcome},
    relay::{RelayClient, RelayPort, RelayService},
};

const CHANNEL_CAPACITY: usize = 16;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub status: &'static str,
    pub headline: String,
    pub details: Vec<String>,
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_shown_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub outcome: ScanOutcome,
    #[serde(skip)]
    pub page_with_overlay: Option<String>,
}

/// Wires the three contexts together: the relay lives for the whole process,
/// a page listener is injected per scanned page.
pub struct ScamSenseApp {
    config: Arc<AppConfig>,
    extractor: Arc<Extractor>,
    relay: RelayClient,
    relay_port: RelayPort,
    relay_handle: JoinHandle<()>,
    loader: PageLoader,
    shutdown: Shutdown,
}

impl ScamSenseApp {
    pub fn initialize(config: AppConfig, shutdown: Shutdown) -> Result<Self> {
        let config = Arc::new(config);
        let http = Client::builder()
            .user_agent(format!("scamsense/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let extractor = Arc::new(
            Extractor::from_config(&config.extraction).context("invalid extraction selectors")?,
        );
        let relay = RelayClient::new(http.clone(), &config.relay)?;
        let (relay_port, relay_inbox) = bridge::channel(CHANNEL_CAPACITY);
        let relay_handle =
            Arc::new(RelayService::new(relay.clone())).spawn(relay_inbox, shutdown.subscribe());
        let loader = PageLoader::new(http, config.page.clone());

        tracing::info!(endpoint = %config.relay.endpoint, "scamsense ready");
        Ok(Self {
            config,
            extractor,
            relay,
            relay_port,
            relay_handle,
            loader,
            shutdown,
        })
    }

    pub async fn load_page(&self, args: &PageArgs) -> Result<PageSnapshot> {
        let page = match &args.file {
            Some(path) => PageSnapshot::from_file(&args.url, path)?,
            None => self.loader.fetch(&args.url).await?,
        };
        Ok(page)
    }

    pub async fn extract(&self, page: PageSnapshot) -> Result<ExtractionResult> {
        let extractor = Arc::clone(&self.extractor);
        let result = tokio::task::spawn_blocking(move || extractor.extract(&page))
            .await
            .context("extraction task failed")?;
        Ok(result)
    }

    pub async fn scan(&self, page: PageSnapshot) -> Result<ScanReport> {
        let overlay = OverlaySlot::new(&self.config.overlay, self.config.thresholds.severe);
        let (page_port, page_inbox) = bridge::channel(CHANNEL_CAPACITY);
        let agent = Arc::new(PageAgent::new(
            page.clone(),
            Arc::clone(&self.extractor),
            self.relay_port.clone(),
            Arc::clone(&overlay),
            self.config.thresholds,
        ));
        let page_handle = agent.spawn(page_inbox, self.shutdown.subscribe());

        let tabs = Arc::new(FocusedTab::new(Some(ActiveTab {
            url: page.url().to_string(),
            port: page_port,
        })));
        let popup = PopupController::new(tabs, Arc::new(self.config.extraction.clone()));
        let outcome = popup
            .on_scan_clicked()
            .await
            .ok_or_else(|| anyhow!("a scan is already running"))?;
        tracing::debug!(target: "popup", state = ?popup.state(), "trigger released");
        // closing the popup unloads the page listener
        drop(popup);
        if let Err(err) = page_handle.await {
            tracing::warn!(target: "page", error = %err, "page listener ended abnormally");
        }

        let shown = overlay.current();
        let page_with_overlay = match &shown {
            Some(_) => match page.document() {
                Ok(html) => Some(overlay.inject_into(&html)),
                Err(err) => {
                    tracing::warn!(target: "overlay", error = %err, "page unreadable; overlay not injected");
                    None
                }
            },
            None => None,
        };

        let line = outcome.status_line();
        Ok(ScanReport {
            status: outcome.status().as_str(),
            headline: line.headline,
            details: line.details,
            color: line.color,
            overlay_id: shown.as_ref().map(|overlay| overlay.id),
            overlay_shown_at: shown.map(|overlay| overlay.shown_at),
            outcome,
            page_with_overlay,
        })
    }

    pub async fn health(&self) -> Result<HealthReport> {
        self.relay.health().await
    }

    pub async fn shutdown(self) {
        let ScamSenseApp {
            relay_port,
            mut relay_handle,
            shutdown,
            ..
        } = self;

        shutdown.trigger();
        drop(relay_port);

        let wait = tokio::time::sleep(SHUTDOWN_TIMEOUT);
        tokio::pin!(wait);
        tokio::select! {
            res = &mut relay_handle => {
                if let Err(err) = res {
                    if err.is_panic() {
                        tracing::error!(target: "relay", "relay listener panicked");
                    }
                }
            }
            _ = &mut wait => {
                tracing::warn!(
                    target: "relay",
                    "relay listener did not stop within {:?}; aborting",
                    SHUTDOWN_TIMEOUT
                );
                relay_handle.abort();
            }
        }
    }
}
