//! Attribution tracker: process-wide initialization, readiness signal and
//! retried purchase-event delivery.
//!
//! This is the client-side delivery strategy. The transport plays the role
//! of an injected tracking script: it becomes available some time after
//! startup, consumers wait for readiness with a bounded poll, and delivery
//! retries on a fixed backoff schedule. Delivery failure is never fatal to
//! the surrounding flow.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::watch;
use tracing::{error, info, warn};
use url::Url;

use crate::objects::purchase::{PurchaseEventPayload, PURCHASE_EVENT};

/// Interval between readiness checks.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Maximum time to wait for the transport before proceeding without one.
pub const READY_MAX_WAIT: Duration = Duration::from_millis(5000);

/// Delays between delivery attempts: 1 initial attempt plus one retry per
/// entry, 4 attempts total.
pub const RETRY_BACKOFF: [Duration; 3] = [
    Duration::from_millis(800),
    Duration::from_millis(1600),
    Duration::from_millis(3200),
];

/// Errors produced by a tracking transport.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("event rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Delivery handle for the attribution provider.
///
/// The production implementation is [`UtmifyTransport`]; tests substitute
/// scripted implementations.
#[async_trait]
pub trait TrackTransport: Send + Sync {
    async fn track(&self, event: &str, payload: &PurchaseEventPayload) -> Result<(), TrackError>;
}

/// Reqwest transport posting events to the attribution provider.
#[derive(Debug, Clone)]
pub struct UtmifyTransport {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl UtmifyTransport {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }
}

#[async_trait]
impl TrackTransport for UtmifyTransport {
    async fn track(&self, _event: &str, payload: &PurchaseEventPayload) -> Result<(), TrackError> {
        let url = self.base_url.join("/v1/events")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TrackError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Handle to the process-wide tracker.
///
/// Cloneable; every clone observes the same readiness signal. Components
/// hold a `Tracker` and await readiness instead of reaching into ambient
/// global state.
#[derive(Clone)]
pub struct Tracker {
    ready: watch::Receiver<Option<Arc<dyn TrackTransport>>>,
}

/// Publishes the transport once it has finished loading.
pub struct TrackerInstaller {
    tx: watch::Sender<Option<Arc<dyn TrackTransport>>>,
}

impl TrackerInstaller {
    /// Flip the readiness signal. Call once, when the transport is usable.
    pub fn provide(&self, transport: Arc<dyn TrackTransport>) {
        let _ = self.tx.send(Some(transport));
    }
}

impl Tracker {
    /// The once-per-application initialization step. Whatever loads the
    /// transport keeps the installer; everything else clones the tracker.
    pub fn install() -> (Tracker, TrackerInstaller) {
        let (tx, rx) = watch::channel(None);
        (Tracker { ready: rx }, TrackerInstaller { tx })
    }

    /// Convenience constructor for a transport that is ready immediately.
    pub fn with_transport(transport: Arc<dyn TrackTransport>) -> Tracker {
        let (tracker, installer) = Tracker::install();
        installer.provide(transport);
        tracker
    }

    /// Poll the readiness signal every [`READY_POLL_INTERVAL`] for up to
    /// `max_wait`. Returns `None` when the transport never became ready;
    /// callers proceed with the null handle rather than blocking.
    pub async fn wait_for_transport(
        &self,
        max_wait: Duration,
    ) -> Option<Arc<dyn TrackTransport>> {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            let current = self.ready.borrow().as_ref().cloned();
            if let Some(transport) = current {
                return Some(transport);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Deliver a purchase event, retrying on [`RETRY_BACKOFF`].
    ///
    /// Runs to completion once started. Exhaustion is logged, never raised;
    /// the returned flag exists for observability only.
    pub async fn track_purchase(&self, payload: &PurchaseEventPayload) -> bool {
        let transport = self.wait_for_transport(READY_MAX_WAIT).await;
        if transport.is_none() {
            warn!(
                waited_ms = READY_MAX_WAIT.as_millis() as u64,
                "tracking transport not ready, attempting anyway"
            );
        }

        if attempt(transport.as_deref(), payload).await {
            return true;
        }
        for delay in RETRY_BACKOFF {
            tokio::time::sleep(delay).await;
            if attempt(transport.as_deref(), payload).await {
                return true;
            }
        }

        error!(
            transaction_id = %payload.transaction_id,
            "purchase event not delivered after retries"
        );
        false
    }
}

async fn attempt(transport: Option<&dyn TrackTransport>, payload: &PurchaseEventPayload) -> bool {
    let Some(transport) = transport else {
        warn!("purchase event attempt failed: transport unavailable");
        return false;
    };
    match transport.track(PURCHASE_EVENT, payload).await {
        Ok(()) => {
            info!(transaction_id = %payload.transaction_id, "purchase event delivered");
            true
        }
        Err(e) => {
            warn!(error = %e, "purchase event attempt failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::payment::{Payer, PaymentRecord, PaymentStatus};
    use crate::objects::purchase::AttributionContext;
    use rust_decimal::Decimal;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct ScriptedTransport {
        succeed: bool,
        attempts: Mutex<Vec<Instant>>,
    }

    impl ScriptedTransport {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                succeed,
                attempts: Mutex::new(Vec::new()),
            })
        }

        fn attempt_offsets(&self, start: Instant) -> Vec<Duration> {
            self.attempts
                .lock()
                .unwrap()
                .iter()
                .map(|at| *at - start)
                .collect()
        }
    }

    #[async_trait]
    impl TrackTransport for ScriptedTransport {
        async fn track(
            &self,
            _event: &str,
            _payload: &PurchaseEventPayload,
        ) -> Result<(), TrackError> {
            self.attempts.lock().unwrap().push(Instant::now());
            if self.succeed {
                Ok(())
            } else {
                Err(TrackError::Rejected {
                    status: 503,
                    body: "unavailable".to_owned(),
                })
            }
        }
    }

    fn payload() -> PurchaseEventPayload {
        let record = PaymentRecord {
            id: "123".to_owned(),
            status: PaymentStatus::Approved,
            transaction_amount: Decimal::new(3900, 2),
            currency_id: Some("BRL".to_owned()),
            payer: Payer { email: None },
        };
        PurchaseEventPayload::from_payment(&record, "Scale Turbo Pro", &AttributionContext::default())
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_needs_no_delay() {
        let transport = ScriptedTransport::new(true);
        let tracker = Tracker::with_transport(transport.clone());

        let start = Instant::now();
        assert!(tracker.track_purchase(&payload()).await);
        assert_eq!(transport.attempt_offsets(start), vec![Duration::ZERO]);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_follow_backoff_schedule_then_stop() {
        let transport = ScriptedTransport::new(false);
        let tracker = Tracker::with_transport(transport.clone());

        let start = Instant::now();
        assert!(!tracker.track_purchase(&payload()).await);

        // 4 attempts total, spaced 800/1600/3200 ms, no 5th attempt.
        let offsets = transport.attempt_offsets(start);
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_millis(800),
                Duration::from_millis(2400),
                Duration::from_millis(5600),
            ]
        );
        assert_eq!(start.elapsed(), Duration::from_millis(5600));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_transport_gives_up_after_bounded_wait() {
        let (tracker, _installer) = Tracker::install();

        let start = Instant::now();
        assert!(!tracker.track_purchase(&payload()).await);

        // 5000 ms readiness wait, then the backoff schedule runs against the
        // null handle with immediate per-attempt failures.
        assert_eq!(start.elapsed(), Duration::from_millis(5000 + 5600));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_arriving_mid_wait_is_picked_up() {
        let (tracker, installer) = Tracker::install();
        let transport = ScriptedTransport::new(true);

        let late = transport.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            installer.provide(late);
        });

        let start = Instant::now();
        assert!(tracker.track_purchase(&payload()).await);

        // Readiness is observed on the next 100 ms poll tick.
        assert_eq!(start.elapsed(), Duration::from_millis(300));
        assert_eq!(transport.attempts.lock().unwrap().len(), 1);
    }
}
