//! Payment provider notification endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use tracing::info;

use confira_core::processor::ConfirmationProcessor;

use crate::state::AppState;

/// Accept a notification and acknowledge it immediately.
///
/// The body is fully buffered by the extractor before this handler runs, so
/// confirmation work can continue after the response is sent. The provider
/// only needs the acknowledgement; every processing failure is logged by the
/// detached task and never reaches the response.
pub async fn receive(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    info!(bytes = body.len(), "webhook notification received");

    tokio::spawn(async move {
        let processor = ConfirmationProcessor::new(
            state.mercado_pago.clone(),
            state.utmify.clone(),
            state.config.product_label.clone(),
        );
        let outcome = processor.process(&body).await;
        info!(?outcome, "webhook notification processed");
    });

    ([(header::CONTENT_TYPE, "text/plain")], "ok")
}
