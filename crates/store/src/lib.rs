//! Relational persistence for the marketplace core.
//!
//! The [`MarketStore`] trait is the single seam between business logic and
//! storage. Two implementations are provided: [`InMemoryMarketStore`] for
//! tests and development, and [`PostgresMarketStore`] backed by sqlx.
//! Soft-delete filtering (`deleted_at IS NULL`) is applied inside each
//! backend so callers never repeat it.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryMarketStore;
pub use postgres::PostgresMarketStore;
pub use query::{OrderQuery, ProductQuery};
pub use records::{
    AuditLogRecord, CategoryRecord, NewAuditEntry, NewNotification, NewOrder, NewOrderLine,
    NewPaymentLog, NewProduct, NewReview, NewUser, NewVendor, NotificationRecord, OrderItemRecord,
    OrderRecord, PaymentLogRecord, PaymentUpdate, ProductRecord, ProductUpdate, ReviewRecord,
    StatusHistoryRecord, UserRecord, VendorRecord,
};
pub use store::MarketStore;
