//! SDK for Confira, a payment-confirmation and attribution-relay service.
//!
//! Contains the shared wire objects (payment snapshots, purchase events,
//! checkout DTOs) and the components that run on the paying user's side of
//! the flow: the payment-status client, the attribution tracker and the
//! confirmation poller.

pub mod client;
pub mod objects;
pub mod poller;
pub mod tracker;
