//! UTMify event-ingestion client (server-side direct delivery).

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::info;
use url::Url;

use confira_sdk::objects::purchase::PurchaseEventPayload;

use crate::processor::EventSink;

/// Default ingestion API root.
pub const DEFAULT_BASE_URL: &str = "https://api.utmify.com.br";

/// Errors that can occur delivering a purchase event.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP request error
    #[error("http error: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider rejected the event (non-2xx status)
    #[error("event rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The base URL could not be joined with the events path
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Typed client for the attribution provider's events endpoint.
#[derive(Debug, Clone)]
pub struct UtmifyClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl UtmifyClient {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Single delivery attempt with bearer authorization; the provider's
    /// response status and body are logged either way. No retry at this
    /// call site: the webhook path relies on the payment provider
    /// re-delivering the notification.
    pub async fn send_event(&self, payload: &PurchaseEventPayload) -> Result<(), DeliveryError> {
        let url = self.base_url.join("/v1/events")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        info!(
            status = status.as_u16(),
            body = %body,
            transaction_id = %payload.transaction_id,
            "attribution provider response"
        );

        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl EventSink for UtmifyClient {
    async fn deliver(&self, payload: &PurchaseEventPayload) -> Result<(), DeliveryError> {
        self.send_event(payload).await
    }
}
