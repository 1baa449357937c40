//! Mercado Pago API client.
//!
//! Typed wrapper over the two provider endpoints this system consumes:
//! `GET /v1/payments/{id}` and `POST /checkout/preferences`. Responses are
//! normalized into the SDK's wire objects; attribution metadata riding on
//! the payment document is recovered alongside the snapshot.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use confira_sdk::objects::checkout::{CheckoutRequest, CheckoutResponse};
use confira_sdk::objects::payment::{Payer, PaymentRecord, PaymentStatus};
use confira_sdk::objects::purchase::{AttributionContext, UtmFields};

use crate::notification::id_value;
use crate::processor::{FetchedPayment, PaymentLookup};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.mercadopago.com";

/// Errors that can occur talking to the payment provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request error
    #[error("http error: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status
    #[error("provider returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The provider's response could not be interpreted
    #[error("invalid provider response: {0}")]
    Decode(String),

    /// The base URL could not be joined with the endpoint path
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Static pieces of the checkout preference document, from configuration.
#[derive(Debug, Clone)]
pub struct PreferenceSettings {
    pub product_title: String,
    pub currency: String,
    pub default_amount: Decimal,
    pub app_origin: String,
    pub notification_url: String,
}

/// Typed client for the payment provider's API.
#[derive(Debug, Clone)]
pub struct MercadoPagoClient {
    http: Client,
    base_url: Url,
    access_token: String,
}

impl MercadoPagoClient {
    pub fn new(base_url: Url, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            access_token: access_token.into(),
        }
    }

    /// Fetch one payment and normalize it. The snapshot is fetched fresh on
    /// every call; nothing is cached.
    pub async fn get_payment(&self, payment_id: &str) -> Result<FetchedPayment, ProviderError> {
        let url = self.base_url.join(&format!("/v1/payments/{payment_id}"))?;
        debug!(payment_id, "querying payment provider");

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let payment: Value = response.json().await?;
        normalize_payment(&payment)
    }

    /// Create a checkout preference and return the redirect data.
    pub async fn create_preference(
        &self,
        request: &CheckoutRequest,
        settings: &PreferenceSettings,
    ) -> Result<CheckoutResponse, ProviderError> {
        let origin = request.origin.as_deref().unwrap_or(&settings.app_origin);
        let amount = request.amount.unwrap_or(settings.default_amount);

        let preference = json!({
            "items": [{
                "title": settings.product_title,
                "quantity": 1,
                "unit_price": amount,
                "currency_id": settings.currency,
            }],
            "payer": { "email": request.email },
            "back_urls": {
                "success": format!("{origin}/success"),
                "failure": format!("{origin}/auth?payment=failure"),
                "pending": format!("{origin}/success"),
            },
            "auto_return": "approved",
            "notification_url": settings.notification_url,
            "external_reference": request.email,
        });

        debug!(email = %request.email, amount = %amount, "creating checkout preference");

        let url = self.base_url.join("/checkout/preferences")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&preference)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let created: Value = response.json().await?;
        let init_point = created
            .get("init_point")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Decode("missing init_point".to_owned()))?;
        let preference_id = created
            .get("id")
            .and_then(id_value)
            .ok_or_else(|| ProviderError::Decode("missing preference id".to_owned()))?;

        info!(preference_id, "checkout preference created");
        Ok(CheckoutResponse {
            init_point: init_point.to_owned(),
            preference_id,
        })
    }
}

#[async_trait]
impl PaymentLookup for MercadoPagoClient {
    async fn fetch_payment(&self, payment_id: &str) -> Result<FetchedPayment, ProviderError> {
        self.get_payment(payment_id).await
    }
}

/// Normalize a full provider payment document into a snapshot plus the
/// attribution context carried in its metadata.
fn normalize_payment(payment: &Value) -> Result<FetchedPayment, ProviderError> {
    let id = payment
        .get("id")
        .and_then(id_value)
        .ok_or_else(|| ProviderError::Decode("missing payment id".to_owned()))?;

    let status = payment
        .get("status")
        .and_then(Value::as_str)
        .map(PaymentStatus::from)
        .unwrap_or(PaymentStatus::Other);

    let transaction_amount = payment
        .get("transaction_amount")
        .map(|v| serde_json::from_value::<Decimal>(v.clone()).unwrap_or_default())
        .unwrap_or_default();

    let currency_id = payment
        .get("currency_id")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let email = payment
        .pointer("/payer/email")
        .and_then(Value::as_str)
        .or_else(|| payment.pointer("/additional_info/payer/email").and_then(Value::as_str))
        .map(str::to_owned);

    let meta = |key: &str| {
        payment
            .pointer(&format!("/metadata/{key}"))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    };

    let visitor_id = meta("visitor_id").or_else(|| {
        payment
            .pointer("/additional_info/items/0/id")
            .and_then(id_value)
    });

    Ok(FetchedPayment {
        record: PaymentRecord {
            id,
            status,
            transaction_amount,
            currency_id,
            payer: Payer { email },
        },
        attribution: AttributionContext {
            visitor_id,
            utm: UtmFields {
                source: meta("utm_source"),
                medium: meta("utm_medium"),
                campaign: meta("utm_campaign"),
                term: meta("utm_term"),
                content: meta("utm_content"),
            },
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_full_payment_document() {
        let payment = json!({
            "id": 123,
            "status": "approved",
            "transaction_amount": 39.00,
            "currency_id": "BRL",
            "payer": { "email": "a@b.com" },
            "metadata": {
                "visitor_id": "v-1",
                "utm_source": "meta",
                "utm_campaign": "launch"
            }
        });

        let fetched = normalize_payment(&payment).unwrap();
        assert_eq!(fetched.record.id, "123");
        assert_eq!(fetched.record.status, PaymentStatus::Approved);
        assert_eq!(fetched.record.transaction_amount, Decimal::new(3900, 2));
        assert_eq!(fetched.record.currency_id.as_deref(), Some("BRL"));
        assert_eq!(fetched.record.payer.email.as_deref(), Some("a@b.com"));
        assert_eq!(fetched.attribution.visitor_id.as_deref(), Some("v-1"));
        assert_eq!(fetched.attribution.utm.source.as_deref(), Some("meta"));
        assert_eq!(fetched.attribution.utm.campaign.as_deref(), Some("launch"));
        assert_eq!(fetched.attribution.utm.medium, None);
    }

    #[test]
    fn falls_back_to_additional_info() {
        let payment = json!({
            "id": "77",
            "status": "approved",
            "additional_info": {
                "payer": { "email": "fallback@b.com" },
                "items": [{ "id": "item-visitor" }]
            }
        });

        let fetched = normalize_payment(&payment).unwrap();
        assert_eq!(fetched.record.transaction_amount, Decimal::ZERO);
        assert_eq!(fetched.record.payer.email.as_deref(), Some("fallback@b.com"));
        assert_eq!(
            fetched.attribution.visitor_id.as_deref(),
            Some("item-visitor")
        );
    }

    #[test]
    fn unknown_status_and_missing_metadata_are_tolerated() {
        let payment = json!({ "id": 5, "status": "charged_back" });
        let fetched = normalize_payment(&payment).unwrap();
        assert_eq!(fetched.record.status, PaymentStatus::Other);
        assert_eq!(fetched.attribution, AttributionContext::default());
    }

    #[test]
    fn missing_id_is_a_decode_error() {
        let payment = json!({ "status": "approved" });
        assert!(matches!(
            normalize_payment(&payment),
            Err(ProviderError::Decode(_))
        ));
    }
}
