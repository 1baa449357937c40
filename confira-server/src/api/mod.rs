//! Request handlers.

pub mod checkout;
pub mod payment_status;
pub mod webhook;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use confira_core::providers::mercado_pago::ProviderError;
use confira_sdk::objects::ApiErrorBody;

/// Errors surfaced to API callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payment_id query parameter is required")]
    MissingPaymentId,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MissingPaymentId => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    error: "payment_id query parameter is required".to_owned(),
                    details: None,
                },
            ),
            // Upstream rejections keep their status so the caller can tell
            // a provider-side 404 from a local failure.
            ApiError::Provider(ProviderError::Upstream { status, body }) => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                ApiErrorBody {
                    error: "payment provider rejected the request".to_owned(),
                    details: Some(body),
                },
            ),
            ApiError::Provider(err) => {
                tracing::error!(error = %err, "provider call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody {
                        error: "payment provider request failed".to_owned(),
                        details: None,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
