//! Payment-status client used by the success page.
//!
//! Failures never escape this boundary: network, API and decode errors are
//! logged and collapsed into `None`, leaving the retry decision to the
//! caller (the confirmation poller loops its own calls).

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;
use url::Url;

use super::ClientError;
use crate::objects::payment::PaymentRecord;

/// Source of payment snapshots, the seam the confirmation poller queries.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current snapshot for `payment_id`, or `None` when the
    /// status is unavailable for any reason.
    async fn payment(&self, payment_id: &str) -> Option<PaymentRecord>;
}

/// Typed HTTP client for `GET /payment-status`.
#[derive(Debug, Clone)]
pub struct PaymentStatusClient {
    http: Client,
    base_url: Url,
}

impl PaymentStatusClient {
    /// Create a new client. `base_url` is the root URL of the Confira server.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    async fn fetch(&self, payment_id: &str) -> Result<PaymentRecord, ClientError> {
        let mut url = self.base_url.join("/payment-status")?;
        url.query_pairs_mut().append_pair("payment_id", payment_id);

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        Ok(resp.json().await?)
    }

    /// Fetch one payment snapshot. Never throws past this boundary.
    pub async fn get_payment(&self, payment_id: &str) -> Option<PaymentRecord> {
        match self.fetch(payment_id).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(payment_id, error = %e, "payment status lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl StatusSource for PaymentStatusClient {
    async fn payment(&self, payment_id: &str) -> Option<PaymentRecord> {
        self.get_payment(payment_id).await
    }
}
