//! Market brief cache and background refresher
//!
//! The refresher regenerates the brief on a fixed interval and publishes it
//! through a watch channel. Readers always see the last successful brief;
//! failed or signal-aborted runs leave it in place.

use crate::agent::{BriefOutcome, Orchestrator};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const BRIEF_UNAVAILABLE: &str = "No market brief available yet. It runs on a schedule.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBrief {
    pub text: String,
    pub generated_at: Option<DateTime<Utc>>,
}

impl MarketBrief {
    pub fn placeholder() -> Self {
        Self {
            text: BRIEF_UNAVAILABLE.to_string(),
            generated_at: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.generated_at.is_none()
    }
}

/// Anything that can produce a market brief on demand.
#[async_trait::async_trait]
pub trait BriefSource: Send + Sync {
    async fn market_brief(&self) -> Result<BriefOutcome>;
}

#[async_trait::async_trait]
impl BriefSource for Orchestrator {
    async fn market_brief(&self) -> Result<BriefOutcome> {
        Orchestrator::market_brief(self).await
    }
}

/// Latest published brief
pub struct BriefCache {
    tx: watch::Sender<Arc<MarketBrief>>,
}

impl BriefCache {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(MarketBrief::placeholder()));
        Self { tx }
    }

    pub fn latest(&self) -> Arc<MarketBrief> {
        self.tx.borrow().clone()
    }

    pub fn publish(&self, text: String) {
        self.tx.send_replace(Arc::new(MarketBrief {
            text,
            generated_at: Some(Utc::now()),
        }));
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<MarketBrief>> {
        self.tx.subscribe()
    }
}

impl Default for BriefCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one refresh. Returns true when a new brief was published.
pub async fn refresh_once(source: &dyn BriefSource, cache: &BriefCache) -> bool {
    match source.market_brief().await {
        Ok(BriefOutcome::Summary(text)) => {
            info!(len = text.len(), "Market brief refreshed");
            cache.publish(text);
            true
        }
        Ok(BriefOutcome::Signal(signal)) => {
            warn!(signal = %signal.0, "Market brief skipped on provider signal");
            false
        }
        Err(e) => {
            warn!(error = %e, "Market brief refresh failed");
            false
        }
    }
}

/// Refresh the brief now and then every `every`.
pub fn spawn_brief_refresher(
    source: Arc<dyn BriefSource>,
    cache: Arc<BriefCache>,
    every: Duration,
) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "Starting market brief refresher");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut cycle: u64 = 0;

        loop {
            interval.tick().await;
            cycle += 1;
            let published = refresh_once(source.as_ref(), &cache).await;
            tracing::debug!(cycle, published, "Brief refresh cycle finished");
        }
    })
}
