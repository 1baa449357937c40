//! Normalized payment snapshot types.
//!
//! A [`PaymentRecord`] is an immutable snapshot fetched fresh from the
//! payment provider on every query. It is never cached beyond a single poll
//! cycle and never persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Payment status, normalized from the provider's status string.
///
/// Statuses the pipeline does not recognize collapse into
/// [`PaymentStatus::Other`] instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Pending,
    InProcess,
    Approved,
    Rejected,
    Cancelled,
    Other,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::InProcess => "in_process",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Other => "other",
        }
    }

    /// Whether the payment reached the terminal-success state.
    pub fn is_approved(self) -> bool {
        matches!(self, PaymentStatus::Approved)
    }

    /// Whether the payment may still transition to approved.
    pub fn is_settling(self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::InProcess)
    }
}

impl From<&str> for PaymentStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending" => PaymentStatus::Pending,
            "in_process" => PaymentStatus::InProcess,
            "approved" => PaymentStatus::Approved,
            "rejected" => PaymentStatus::Rejected,
            "cancelled" => PaymentStatus::Cancelled,
            _ => PaymentStatus::Other,
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(s: String) -> Self {
        s.as_str().into()
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payer details carried on a payment snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub email: Option<String>,
}

/// Immutable snapshot of a payment's state at the provider.
///
/// Wire shape of the payment-status endpoint:
/// `{id, status, transaction_amount, currency_id, payer: {email}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Opaque provider identifier. The provider serializes this as either a
    /// JSON number or a string; both normalize to a string here.
    #[serde(deserialize_with = "id_string_or_number")]
    pub id: String,
    pub status: PaymentStatus,
    pub transaction_amount: Decimal,
    #[serde(default)]
    pub currency_id: Option<String>,
    #[serde(default)]
    pub payer: Payer,
}

fn id_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Num(serde_json::Number),
        Text(String),
    }

    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Num(n) => n.to_string(),
        IdRepr::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_id_normalizes_to_string() {
        let record: PaymentRecord = serde_json::from_value(serde_json::json!({
            "id": 123,
            "status": "approved",
            "transaction_amount": 39.00,
            "currency_id": "BRL",
            "payer": { "email": "a@b.com" }
        }))
        .unwrap();
        assert_eq!(record.id, "123");
        assert_eq!(record.status, PaymentStatus::Approved);
        assert_eq!(record.payer.email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn string_id_passes_through() {
        let record: PaymentRecord = serde_json::from_value(serde_json::json!({
            "id": "abc-42",
            "status": "pending",
            "transaction_amount": 10.5,
        }))
        .unwrap();
        assert_eq!(record.id, "abc-42");
        assert_eq!(record.currency_id, None);
        assert_eq!(record.payer.email, None);
    }

    #[test]
    fn unknown_status_collapses_to_other() {
        let status: PaymentStatus = serde_json::from_value(serde_json::json!("charged_back")).unwrap();
        assert_eq!(status, PaymentStatus::Other);
        assert!(!status.is_approved());
        assert!(!status.is_settling());
    }

    #[test]
    fn status_round_trips_as_snake_case() {
        let json = serde_json::to_value(PaymentStatus::InProcess).unwrap();
        assert_eq!(json, serde_json::json!("in_process"));
        assert_eq!(PaymentStatus::from("in_process"), PaymentStatus::InProcess);
        assert!(PaymentStatus::InProcess.is_settling());
    }
}
