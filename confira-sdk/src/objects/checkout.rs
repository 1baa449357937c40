//! Checkout-creation DTOs and the shared JSON error body.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `POST /checkout` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub email: String,
    /// Falls back to the configured unit price when absent.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Origin the payer is redirected back to; falls back to configuration.
    #[serde(default)]
    pub origin: Option<String>,
}

/// `POST /checkout` success response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub init_point: String,
    pub preference_id: String,
}

/// JSON error object emitted by the synchronous endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
