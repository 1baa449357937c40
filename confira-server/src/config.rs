//! Configuration for confira-server.
//!
//! Configuration comes from a TOML file with CLI and environment overrides
//! (`MERCADO_PAGO_ACCESS_TOKEN`, `UTMIFY_API_KEY` take precedence over the
//! file for the two secrets). Validation runs once at startup: missing
//! secrets or an unset notification URL abort the process instead of
//! failing closed on individual requests later.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Environment override for the payment-provider access token.
pub const MP_TOKEN_ENV: &str = "MERCADO_PAGO_ACCESS_TOKEN";
/// Environment override for the attribution-provider API key.
pub const UTMIFY_KEY_ENV: &str = "UTMIFY_API_KEY";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub providers: ProvidersSection,
    #[serde(default)]
    pub product: ProductSection,
    #[serde(default)]
    pub urls: UrlsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersSection {
    #[serde(default)]
    pub mercado_pago_access_token: String,
    #[serde(default)]
    pub utmify_api_key: String,
    #[serde(default = "default_mp_base_url")]
    pub mercado_pago_base_url: Url,
    #[serde(default = "default_utmify_base_url")]
    pub utmify_base_url: Url,
}

impl Default for ProvidersSection {
    fn default() -> Self {
        Self {
            mercado_pago_access_token: String::new(),
            utmify_api_key: String::new(),
            mercado_pago_base_url: default_mp_base_url(),
            utmify_base_url: default_utmify_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductSection {
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_unit_price")]
    pub unit_price: Decimal,
}

impl Default for ProductSection {
    fn default() -> Self {
        Self {
            label: default_label(),
            currency: default_currency(),
            unit_price: default_unit_price(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlsSection {
    /// Origin the payer is redirected back to after checkout.
    #[serde(default)]
    pub app_origin: String,
    /// Public URL the payment provider posts notifications to.
    #[serde(default)]
    pub notification_url: String,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_mp_base_url() -> Url {
    Url::parse(confira_core::providers::mercado_pago::DEFAULT_BASE_URL)
        .expect("default payment provider URL is valid")
}

fn default_utmify_base_url() -> Url {
    Url::parse(confira_core::providers::utmify::DEFAULT_BASE_URL)
        .expect("default attribution provider URL is valid")
}

fn default_label() -> String {
    "Scale Turbo Pro".to_owned()
}

fn default_currency() -> String {
    "BRL".to_owned()
}

fn default_unit_price() -> Decimal {
    Decimal::new(3900, 2)
}

/// Validated runtime configuration handed to components at construction.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub listen: SocketAddr,
    pub mercado_pago_access_token: String,
    pub utmify_api_key: String,
    pub mercado_pago_base_url: Url,
    pub utmify_base_url: Url,
    pub product_label: String,
    pub currency: String,
    pub unit_price: Decimal,
    pub app_origin: String,
    pub notification_url: String,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, apply CLI and environment overrides, validate.
    pub fn load(&self) -> Result<RuntimeConfig, ConfigError> {
        let content = std::fs::read_to_string(&self.config_path)?;
        let file: FileConfig = toml::from_str(&content)?;
        self.build(
            file,
            env_override(MP_TOKEN_ENV),
            env_override(UTMIFY_KEY_ENV),
        )
    }

    fn build(
        &self,
        mut file: FileConfig,
        mp_token: Option<String>,
        utmify_key: Option<String>,
    ) -> Result<RuntimeConfig, ConfigError> {
        if let Some(token) = mp_token {
            file.providers.mercado_pago_access_token = token;
        }
        if let Some(key) = utmify_key {
            file.providers.utmify_api_key = key;
        }

        if file.providers.mercado_pago_access_token.is_empty() {
            return Err(ConfigError::Validation(format!(
                "payment provider access token is not configured (set [providers] or {MP_TOKEN_ENV})"
            )));
        }
        if file.providers.utmify_api_key.is_empty() {
            return Err(ConfigError::Validation(format!(
                "attribution provider API key is not configured (set [providers] or {UTMIFY_KEY_ENV})"
            )));
        }
        if file.urls.notification_url.is_empty() {
            return Err(ConfigError::Validation(
                "[urls] notification_url is not configured".to_owned(),
            ));
        }

        Ok(RuntimeConfig {
            listen: self.listen_override.unwrap_or(file.server.listen),
            mercado_pago_access_token: file.providers.mercado_pago_access_token,
            utmify_api_key: file.providers.utmify_api_key,
            mercado_pago_base_url: file.providers.mercado_pago_base_url,
            utmify_base_url: file.providers.utmify_base_url,
            product_label: file.product.label,
            currency: file.product.currency,
            unit_price: file.product.unit_price,
            app_origin: file.urls.app_origin,
            notification_url: file.urls.notification_url,
        })
    }
}

fn env_override(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}
