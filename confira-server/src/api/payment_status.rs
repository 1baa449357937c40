//! Payment status proxy queried by the browser during confirmation polling.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::debug;

use confira_sdk::objects::PaymentRecord;

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub payment_id: Option<String>,
}

/// Fetch the current snapshot of one payment from the provider.
///
/// Only the normalized snapshot is returned; attribution metadata stays
/// server-side.
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<PaymentRecord>, ApiError> {
    let payment_id = query
        .payment_id
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingPaymentId)?;

    debug!(payment_id, "payment status requested");
    let fetched = state.mercado_pago.get_payment(&payment_id).await?;
    Ok(Json(fetched.record))
}
