//! Row types exchanged with the store.
//!
//! `*Record` types mirror persisted rows; `New*` types carry the fields a
//! caller supplies on insert. Ids and timestamps for new rows are assigned
//! by the store unless the type says otherwise.

use chrono::{DateTime, Utc};
use common::{
    Money, NotificationKind, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, Role,
    SubscriptionTier, UserId, VendorId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
}

/// A vendor account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorRecord {
    pub id: VendorId,
    pub user_id: UserId,
    pub business_name: String,
    pub tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a vendor.
#[derive(Debug, Clone)]
pub struct NewVendor {
    pub user_id: UserId,
    pub business_name: String,
    pub tier: SubscriptionTier,
}

/// A catalog product. `deleted_at` marks soft deletion; active-row reads
/// never return archived products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub image_url: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ProductRecord {
    /// Returns true if the product has not been archived.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Fields for inserting a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub vendor_id: VendorId,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub image_url: Option<String>,
    pub featured: bool,
}

/// Partial update of a product; None fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub image_url: Option<String>,
    pub featured: Option<bool>,
}

/// An order header. Money columns are stored separately so the pricing
/// breakdown survives policy changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub shipping_address: serde_json::Value,
    pub payment_method: Option<PaymentMethod>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A single line of a new order. Name and unit price are snapshots taken
/// at checkout; they never change once the order is created.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// A complete order to be created atomically. The caller assigns the id so
/// it can reference the order before the store round-trip completes.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<NewOrderLine>,
    pub shipping_address: serde_json::Value,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

/// A persisted order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItemRecord {
    /// Line total (unit price at purchase time times quantity).
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// One entry of the append-only order status trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryRecord {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub changed_by: Option<UserId>,
    pub changed_at: DateTime<Utc>,
}

/// Payment fields applied to an order. The update is idempotent: applying
/// the same values twice leaves the order unchanged.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub method: Option<PaymentMethod>,
}

/// One row of the append-only payment attempt log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLogRecord {
    pub id: Uuid,
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub amount: Money,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub response: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Fields for logging a payment attempt.
#[derive(Debug, Clone)]
pub struct NewPaymentLog {
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub amount: Money,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub response: serde_json::Value,
}

/// A product review tied to a specific order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub rating: i16,
    pub comment: String,
}

/// A user-facing notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub message: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub message: String,
    pub kind: NotificationKind,
}

/// Fields for appending to the cross-cutting audit trail.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: Option<UserId>,
    pub action: String,
    pub table_name: String,
    pub record_id: Option<String>,
    pub details: serde_json::Value,
}

/// A persisted audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogRecord {
    pub id: i64,
    pub user_id: Option<UserId>,
    pub action: String,
    pub table_name: String,
    pub record_id: Option<String>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
