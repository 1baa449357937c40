pub mod checkout;
pub mod payment;
pub mod purchase;

pub use checkout::{ApiErrorBody, CheckoutRequest, CheckoutResponse};
pub use payment::{Payer, PaymentRecord, PaymentStatus};
pub use purchase::{AttributionContext, PurchaseEventPayload, UtmFields, PURCHASE_EVENT};
