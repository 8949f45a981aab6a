//! HTTP route handlers, one module per resource.

pub mod cart;
pub mod checkout;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
