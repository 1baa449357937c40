//! Application state shared across all request handlers.

use std::sync::Arc;

use confira_core::providers::{MercadoPagoClient, UtmifyClient};

use crate::config::RuntimeConfig;

/// Cloneable state handed to every handler.
///
/// There is no shared mutable state: each request and each background
/// confirmation task operates on independently fetched data, so no locks
/// are needed.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RuntimeConfig>,
    pub mercado_pago: MercadoPagoClient,
    pub utmify: UtmifyClient,
}

impl AppState {
    /// Build the provider clients from validated configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        let mercado_pago = MercadoPagoClient::new(
            config.mercado_pago_base_url.clone(),
            config.mercado_pago_access_token.clone(),
        );
        let utmify = UtmifyClient::new(
            config.utmify_base_url.clone(),
            config.utmify_api_key.clone(),
        );
        Self {
            config: Arc::new(config),
            mercado_pago,
            utmify,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use rust_decimal::Decimal;
    use std::net::SocketAddr;
    use url::Url;

    /// State wired to unroutable provider endpoints; tests exercising only
    /// the handler surface never reach them.
    pub(crate) fn state() -> AppState {
        AppState::new(RuntimeConfig {
            listen: SocketAddr::from(([127, 0, 0, 1], 0)),
            mercado_pago_access_token: "test-token".to_owned(),
            utmify_api_key: "test-key".to_owned(),
            mercado_pago_base_url: Url::parse("http://127.0.0.1:9").unwrap(),
            utmify_base_url: Url::parse("http://127.0.0.1:9").unwrap(),
            product_label: "Scale Turbo Pro".to_owned(),
            currency: "BRL".to_owned(),
            unit_price: Decimal::new(3900, 2),
            app_origin: "https://app.example.com".to_owned(),
            notification_url: "https://api.example.com/webhook".to_owned(),
        })
    }
}
