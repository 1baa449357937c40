//! Client-side confirmation poller for the payment success page.
//!
//! State machine: `init → checking → {pending, approved, error, timed_out}`.
//! While the payment is settling the poller re-queries the status source on a
//! fixed interval; the loop is cancellable through a teardown signal owned by
//! the hosting view, so nothing is dispatched after the view is gone.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::StatusSource;
use crate::objects::payment::{PaymentRecord, PaymentStatus};
use crate::objects::purchase::{AttributionContext, PurchaseEventPayload};
use crate::tracker::Tracker;

/// Interval between status re-queries while the payment is settling.
pub const POLL_INTERVAL: Duration = Duration::from_millis(4000);

/// Maximum number of spaced re-queries after the initial check (≈28 s).
pub const MAX_POLL_ATTEMPTS: u32 = 7;

/// Reason the poller ended in the error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmError {
    /// No payment identifier in the page parameters.
    MissingPaymentId,
    /// The status client returned nothing on the initial check.
    StatusUnavailable,
}

impl std::fmt::Display for ConfirmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmError::MissingPaymentId => f.write_str("payment identifier missing"),
            ConfirmError::StatusUnavailable => f.write_str("payment status unavailable"),
        }
    }
}

/// Terminal result of one poller instance.
#[derive(Debug, Clone)]
pub enum ConfirmationOutcome {
    /// Payment approved; the purchase event was dispatched exactly once.
    Approved(PaymentRecord),
    /// Terminal failure, shown to the user as an error panel.
    Error(ConfirmError),
    /// Attempt budget exhausted while the payment was still settling.
    /// Neutral, not an error: the user sees "not confirmed yet".
    TimedOut,
    /// Terminal non-approved provider status; neutral display, no event.
    NotConfirmed(PaymentStatus),
    /// The hosting view was torn down before completion.
    Cancelled,
}

/// Create the teardown signal pair. The sender belongs to the hosting view;
/// sending `true` or dropping the sender cancels the poller.
pub fn teardown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Confirmation poller bound to one page load.
pub struct ConfirmationPoller<S> {
    status: S,
    tracker: Tracker,
    product: String,
    attribution: AttributionContext,
    teardown: watch::Receiver<bool>,
}

impl<S: StatusSource> ConfirmationPoller<S> {
    pub fn new(
        status: S,
        tracker: Tracker,
        product: impl Into<String>,
        attribution: AttributionContext,
        teardown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            status,
            tracker,
            product: product.into(),
            attribution,
            teardown,
        }
    }

    /// Run to a terminal state. Dispatches the purchase event at most once;
    /// exactly one of success, timeout or teardown ends the instance.
    pub async fn run(mut self, payment_id: Option<&str>) -> ConfirmationOutcome {
        let Some(payment_id) = payment_id else {
            warn!("success page loaded without a payment identifier");
            return ConfirmationOutcome::Error(ConfirmError::MissingPaymentId);
        };
        info!(payment_id, "confirming payment");

        let Some(record) = self.status.payment(payment_id).await else {
            return ConfirmationOutcome::Error(ConfirmError::StatusUnavailable);
        };

        match record.status {
            PaymentStatus::Approved => {
                self.dispatch(&record).await;
                ConfirmationOutcome::Approved(record)
            }
            status if status.is_settling() => self.poll_until_approved(payment_id).await,
            other => {
                info!(payment_id, status = %other, "payment not confirmed");
                ConfirmationOutcome::NotConfirmed(other)
            }
        }
    }

    async fn poll_until_approved(&mut self, payment_id: &str) -> ConfirmationOutcome {
        info!(payment_id, "payment still settling, polling");

        for attempt in 1..=MAX_POLL_ATTEMPTS {
            if self.wait_or_teardown().await {
                info!(payment_id, "poller cancelled by view teardown");
                return ConfirmationOutcome::Cancelled;
            }

            debug!(payment_id, attempt, max = MAX_POLL_ATTEMPTS, "re-querying payment status");
            match self.status.payment(payment_id).await {
                Some(record) if record.status.is_approved() => {
                    info!(payment_id, attempt, "payment approved during polling");
                    self.dispatch(&record).await;
                    return ConfirmationOutcome::Approved(record);
                }
                // Still settling, or transiently unavailable: keep polling.
                Some(_) | None => {}
            }
        }

        info!(payment_id, "confirmation window elapsed, payment still settling");
        ConfirmationOutcome::TimedOut
    }

    /// Wait one poll interval; `true` when the view tore down first.
    async fn wait_or_teardown(&mut self) -> bool {
        let sleep = tokio::time::sleep(POLL_INTERVAL);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;
                changed = self.teardown.changed() => {
                    if changed.is_err() || *self.teardown.borrow() {
                        return true;
                    }
                    // Spurious update, keep waiting.
                }
                _ = &mut sleep => return false,
            }
        }
    }

    async fn dispatch(&self, record: &PaymentRecord) {
        let payload =
            PurchaseEventPayload::from_payment(record, self.product.clone(), &self.attribution);
        info!(
            transaction_id = %payload.transaction_id,
            value = %payload.value,
            "dispatching purchase event"
        );
        self.tracker.track_purchase(&payload).await;
    }
}
