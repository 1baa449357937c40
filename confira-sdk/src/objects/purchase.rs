//! Purchase event sent to the attribution provider.
//!
//! A [`PurchaseEventPayload`] is constructed fresh per confirmation once a
//! payment reaches the terminal-success state. Delivery is fire-and-forget
//! with retry; the payload is never persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::payment::PaymentRecord;

/// Event name carried on every purchase payload.
pub const PURCHASE_EVENT: &str = "purchase";

/// Currency reported when the provider snapshot does not carry one.
pub const DEFAULT_CURRENCY: &str = "BRL";

/// Campaign-attribution parameters carried from visit to purchase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmFields {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
    pub term: Option<String>,
    pub content: Option<String>,
}

/// Visitor identity and UTM parameters known at confirmation time.
///
/// On the success page these come from the in-page tracker; on the webhook
/// path they are recovered from the provider's payment metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributionContext {
    pub visitor_id: Option<String>,
    pub utm: UtmFields,
}

/// Normalized purchase event for the attribution provider's ingestion
/// endpoint. Nullable fields serialize as JSON `null`, not omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseEventPayload {
    pub event: String,
    pub value: Decimal,
    pub currency: String,
    pub transaction_id: String,
    pub product: String,
    pub customer_email: Option<String>,
    pub status: String,
    pub visitor_id: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub notify_app: bool,
}

impl PurchaseEventPayload {
    /// Build the event from a payment snapshot and the attribution context.
    pub fn from_payment(
        payment: &PaymentRecord,
        product: impl Into<String>,
        attribution: &AttributionContext,
    ) -> Self {
        Self {
            event: PURCHASE_EVENT.to_owned(),
            value: payment.transaction_amount,
            currency: payment
                .currency_id
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_owned()),
            transaction_id: payment.id.clone(),
            product: product.into(),
            customer_email: payment.payer.email.clone(),
            status: payment.status.to_string(),
            visitor_id: attribution.visitor_id.clone(),
            utm_source: attribution.utm.source.clone(),
            utm_medium: attribution.utm.medium.clone(),
            utm_campaign: attribution.utm.campaign.clone(),
            utm_term: attribution.utm.term.clone(),
            utm_content: attribution.utm.content.clone(),
            notify_app: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::payment::{Payer, PaymentStatus};

    fn approved_record() -> PaymentRecord {
        PaymentRecord {
            id: "123".to_owned(),
            status: PaymentStatus::Approved,
            transaction_amount: Decimal::new(3900, 2),
            currency_id: None,
            payer: Payer {
                email: Some("a@b.com".to_owned()),
            },
        }
    }

    #[test]
    fn payload_carries_payment_fields() {
        let attribution = AttributionContext {
            visitor_id: Some("v-1".to_owned()),
            utm: UtmFields {
                source: Some("meta".to_owned()),
                campaign: Some("launch".to_owned()),
                ..UtmFields::default()
            },
        };
        let payload =
            PurchaseEventPayload::from_payment(&approved_record(), "Scale Turbo Pro", &attribution);

        assert_eq!(payload.event, "purchase");
        assert_eq!(payload.value, Decimal::new(3900, 2));
        assert_eq!(payload.currency, "BRL");
        assert_eq!(payload.transaction_id, "123");
        assert_eq!(payload.product, "Scale Turbo Pro");
        assert_eq!(payload.customer_email.as_deref(), Some("a@b.com"));
        assert_eq!(payload.status, "approved");
        assert_eq!(payload.visitor_id.as_deref(), Some("v-1"));
        assert_eq!(payload.utm_source.as_deref(), Some("meta"));
        assert_eq!(payload.utm_medium, None);
        assert!(payload.notify_app);
    }

    #[test]
    fn absent_attribution_serializes_as_null() {
        let payload = PurchaseEventPayload::from_payment(
            &approved_record(),
            "Scale Turbo Pro",
            &AttributionContext::default(),
        );
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["visitor_id"], serde_json::Value::Null);
        assert_eq!(json["utm_term"], serde_json::Value::Null);
        assert_eq!(json["value"], serde_json::json!(39.0));
    }
}
