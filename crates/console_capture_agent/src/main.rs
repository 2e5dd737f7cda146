use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use cdp_bridge_core::client::CdpBrowser;
use cdp_bridge_core::{CdpConfig, DebuggerProtocol, TargetId};
use console_capture_agent::{
    AttachmentManager, DeliveryQueue, EventRouter, HttpReportSink, ReportConfig,
};

/// How often the browser's target list is re-scanned for pages to attach.
const TARGET_SCAN_INTERVAL: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cdp_config = CdpConfig::from_env();
    let report_config = ReportConfig::from_env();

    let (browser, mut events) = CdpBrowser::new(cdp_config.clone());
    let browser = Arc::new(browser);
    let protocol: Arc<dyn DebuggerProtocol> = browser.clone();

    let manager = Arc::new(AttachmentManager::new(
        protocol.clone(),
        cdp_config.protocol_version.clone(),
    ));
    let sink = Arc::new(HttpReportSink::new(&report_config));
    let queue = DeliveryQueue::new(sink);
    queue.clone().run_flush_timer(report_config.flush_interval);

    let router = EventRouter::new(protocol, manager.clone(), queue);

    tracing::info!(
        "console capture agent watching {} -> {:?}",
        cdp_config.endpoint,
        report_config.endpoints
    );

    {
        let browser = browser.clone();
        let manager = manager.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TARGET_SCAN_INTERVAL);
            loop {
                ticker.tick().await;
                scan_targets(&browser, &manager).await;
            }
        });
    }

    while let Some((target, event)) = events.recv().await {
        router.on_protocol_event(&target, event).await;
    }

    Ok(())
}

/// Reconcile attachments with the browser's current target list: attach new
/// pages, force-detach targets that disappeared.
async fn scan_targets(browser: &CdpBrowser, manager: &AttachmentManager) {
    let targets = match browser.discover_targets().await {
        Ok(targets) => targets,
        Err(e) => {
            tracing::debug!("target discovery failed: {e}");
            return;
        }
    };

    let pages: Vec<_> = targets.into_iter().filter(|t| t.kind == "page").collect();
    let live: HashSet<TargetId> = pages.iter().map(|t| t.target_id()).collect();

    for target in manager.attached_targets().await {
        if !live.contains(&target) {
            manager.on_target_removed(&target).await;
        }
    }

    for page in &pages {
        manager.attach(&page.target_id()).await;
    }
}
