//! Outbound provider clients.

pub mod mercado_pago;
pub mod utmify;

pub use mercado_pago::MercadoPagoClient;
pub use utmify::UtmifyClient;
