//! The inventory mutation engine and the domain state machines around it
//! (purchase-order lifecycle, shipment events, the `qty_on_order`
//! projection). This crate owns every write to `stock_levels` and
//! `stock_movements`; the gateway binary only translates HTTP to calls
//! against the services here.

pub mod error;
pub mod idempotency;
pub mod models;
pub mod services;

pub use error::{DomainError, DomainResult};
