//! Background confirmation pipeline for incoming payment notifications.
//!
//! The processor runs detached from the webhook response path. Every stage
//! is logged and every failure is absorbed here; nothing propagates back to
//! the notifying provider. Delivery of the same transaction more than once
//! is tolerated (the provider re-delivers notifications at least once), with
//! each notification producing an independent delivery attempt.

use async_trait::async_trait;
use tracing::{info, warn};

use confira_sdk::objects::payment::{PaymentRecord, PaymentStatus};
use confira_sdk::objects::purchase::{AttributionContext, PurchaseEventPayload};

use crate::notification::extract_payment_id;
use crate::providers::mercado_pago::ProviderError;
use crate::providers::utmify::DeliveryError;

/// A payment snapshot plus the attribution metadata recovered from the
/// provider's full payment document.
#[derive(Debug, Clone)]
pub struct FetchedPayment {
    pub record: PaymentRecord,
    pub attribution: AttributionContext,
}

/// Lookup seam over the payment provider.
#[async_trait]
pub trait PaymentLookup: Send + Sync {
    async fn fetch_payment(&self, payment_id: &str) -> Result<FetchedPayment, ProviderError>;
}

/// Delivery seam over the attribution provider (server-side direct strategy,
/// single attempt per call).
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, payload: &PurchaseEventPayload) -> Result<(), DeliveryError>;
}

/// Terminal result of processing a single notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// No payment identifier could be extracted; nothing to do.
    NoIdentifier,
    /// The provider lookup failed; logged and dropped.
    LookupFailed,
    /// The payment has not reached the terminal-success state; skipped.
    NotApproved(PaymentStatus),
    /// The purchase event was delivered.
    Delivered,
    /// Delivery was attempted and failed. Not retried here: the provider
    /// re-delivers the notification on its own schedule.
    DeliveryFailed,
}

/// Confirmation pipeline: extract identifier, fetch detail, gate on status,
/// dispatch the purchase event.
pub struct ConfirmationProcessor<L, S> {
    lookup: L,
    sink: S,
    product: String,
}

impl<L: PaymentLookup, S: EventSink> ConfirmationProcessor<L, S> {
    pub fn new(lookup: L, sink: S, product: impl Into<String>) -> Self {
        Self {
            lookup,
            sink,
            product: product.into(),
        }
    }

    /// Process one raw notification body to completion.
    pub async fn process(&self, body: &[u8]) -> ProcessOutcome {
        let Some(payment_id) = extract_payment_id(body) else {
            info!("notification carries no payment identifier, ignoring");
            return ProcessOutcome::NoIdentifier;
        };
        info!(payment_id, "processing payment notification");

        let fetched = match self.lookup.fetch_payment(&payment_id).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(payment_id, error = %e, "payment lookup failed");
                return ProcessOutcome::LookupFailed;
            }
        };
        info!(payment_id, status = %fetched.record.status, "payment detail fetched");

        // Dispatch only on approved, the same gate the success-page poller
        // applies.
        if !fetched.record.status.is_approved() {
            info!(
                payment_id,
                status = %fetched.record.status,
                "payment not approved, skipping purchase event"
            );
            return ProcessOutcome::NotApproved(fetched.record.status);
        }

        let payload = PurchaseEventPayload::from_payment(
            &fetched.record,
            self.product.clone(),
            &fetched.attribution,
        );
        match self.sink.deliver(&payload).await {
            Ok(()) => {
                info!(transaction_id = %payload.transaction_id, "purchase event delivered");
                ProcessOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    transaction_id = %payload.transaction_id,
                    error = %e,
                    "purchase event delivery failed"
                );
                ProcessOutcome::DeliveryFailed
            }
        }
    }
}
