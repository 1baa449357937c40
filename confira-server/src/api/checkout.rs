//! Checkout preference creation.

use axum::Json;
use axum::extract::State;
use tracing::info;

use confira_core::providers::mercado_pago::PreferenceSettings;
use confira_sdk::objects::{CheckoutRequest, CheckoutResponse};

use super::ApiError;
use crate::state::AppState;

/// Create a provider checkout preference for the configured product and
/// return the redirect data.
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    info!(email = %request.email, "checkout requested");

    let settings = PreferenceSettings {
        product_title: state.config.product_label.clone(),
        currency: state.config.currency.clone(),
        default_amount: state.config.unit_price,
        app_origin: state.config.app_origin.clone(),
        notification_url: state.config.notification_url.clone(),
    };

    let response = state.mercado_pago.create_preference(&request, &settings).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::state::testing;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    #[tokio::test]
    async fn rejects_non_json_body() {
        let router = build_router(testing::state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/checkout")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from("email=a@b.com"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
