//! Business services for the marketplace core.
//!
//! Services here own the rules; persistence stays behind the
//! [`store::MarketStore`] trait. The order service applies the status state
//! machine, the catalog service enforces vendor tier limits, and every
//! mutating operation authorizes against an [`Actor`] before touching the
//! store.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;
pub mod pricing;
pub mod review;

pub use auth::Actor;
pub use cart::{Cart, CartLine, CartService};
pub use catalog::{CatalogService, NewProductInput};
pub use error::{DomainError, Result};
pub use order::OrderService;
pub use pricing::{PricingPolicy, Totals};
pub use review::ReviewService;
