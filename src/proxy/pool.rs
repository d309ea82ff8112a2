//! Shared outbound HTTP client with per-target concurrency budgets.
//!
//! # Responsibilities
//! - Own the single pooled `reqwest::Client` used by every handler
//! - Bound in-flight requests per target with a semaphore
//! - Hand out permits that live as long as the upstream exchange
//!
//! # Design Decisions
//! - License and media traffic draw from separate budgets
//! - Waiting for a permit queues the request instead of failing it
//! - A media permit is held until its body stream ends or is dropped
//! - Closing the pool at shutdown fails queued requests with 503 while
//!   exchanges that already hold a permit drain

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::schema::UpstreamConfig;
use crate::proxy::error::ProxyError;

/// Which forwarding path an upstream call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    License,
    Media,
}

impl UpstreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UpstreamKind::License => "license",
            UpstreamKind::Media => "media",
        }
    }
}

/// Outbound client plus the concurrency limits around it.
#[derive(Debug)]
pub struct UpstreamPool {
    client: reqwest::Client,
    license_slots: Arc<Semaphore>,
    media_slots: Arc<Semaphore>,
    timeout: Duration,
}

impl UpstreamPool {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            license_slots: Arc::new(Semaphore::new(config.license_max_concurrent)),
            media_slots: Arc::new(Semaphore::new(config.media_max_concurrent)),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Deadline applied to every upstream exchange.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn slots(&self, kind: UpstreamKind) -> &Arc<Semaphore> {
        match kind {
            UpstreamKind::License => &self.license_slots,
            UpstreamKind::Media => &self.media_slots,
        }
    }

    /// Wait for a free slot on the given path.
    pub async fn acquire(&self, kind: UpstreamKind) -> Result<OwnedSemaphorePermit, ProxyError> {
        let slots = self.slots(kind);
        if slots.available_permits() == 0 {
            tracing::debug!(upstream = kind.as_str(), "Upstream budget exhausted, queuing");
        }
        slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ProxyError::PoolClosed)
    }

    pub fn available(&self, kind: UpstreamKind) -> usize {
        self.slots(kind).available_permits()
    }

    /// Stop handing out permits. Waiters and later callers get
    /// [`ProxyError::PoolClosed`].
    pub fn close(&self) {
        self.license_slots.close();
        self.media_slots.close();
        tracing::info!("Upstream pool closed");
    }
}
