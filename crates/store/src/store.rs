use async_trait::async_trait;
use common::{OrderId, OrderStatus, ProductId, Role, UserId, VendorId};
use uuid::Uuid;

use crate::query::{OrderQuery, ProductQuery};
use crate::records::{
    AuditLogRecord, CategoryRecord, NewAuditEntry, NewNotification, NewOrder, NewPaymentLog,
    NewProduct, NewReview, NewUser, NewVendor, NotificationRecord, OrderItemRecord, OrderRecord,
    PaymentLogRecord, PaymentUpdate, ProductRecord, ProductUpdate, ReviewRecord,
    StatusHistoryRecord, UserRecord, VendorRecord,
};
use crate::Result;

/// Core trait for marketplace persistence.
///
/// Implementations must be thread-safe (Send + Sync). Reads of products and
/// orders exclude soft-deleted rows; the filter lives in the backend, not in
/// callers.
#[async_trait]
pub trait MarketStore: Send + Sync {
    // -- Users --

    /// Inserts a user and returns the stored row.
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord>;

    /// Looks up a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>>;

    /// Lists all users with the given role. Used for role-filtered
    /// notification broadcasts.
    async fn list_users_by_role(&self, role: Role) -> Result<Vec<UserRecord>>;

    // -- Catalog --

    /// Inserts a category.
    async fn insert_category(&self, name: &str) -> Result<CategoryRecord>;

    /// Inserts a vendor.
    async fn insert_vendor(&self, vendor: NewVendor) -> Result<VendorRecord>;

    /// Looks up a vendor by id.
    async fn get_vendor(&self, id: VendorId) -> Result<Option<VendorRecord>>;

    /// Counts a vendor's active (non-archived) products. Consulted when
    /// enforcing subscription tier limits.
    async fn count_active_products(&self, vendor_id: VendorId) -> Result<u64>;

    /// Inserts a product and returns the stored row.
    async fn insert_product(&self, product: NewProduct) -> Result<ProductRecord>;

    /// Looks up an active product by id. Archived products read as absent.
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>>;

    /// Lists active products matching the query.
    async fn list_products(&self, query: ProductQuery) -> Result<Vec<ProductRecord>>;

    /// Applies a partial update to an active product.
    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<ProductRecord>;

    /// Soft-deletes a product. Subsequent reads treat it as absent.
    async fn archive_product(&self, id: ProductId) -> Result<()>;

    // -- Orders --

    /// Creates an order atomically: re-validates stock for every line,
    /// decrements product stock, and inserts the order header, its items
    /// and the initial `pending` status history row — all or nothing.
    ///
    /// Fails with [`StoreError::StockConflict`] if any line's quantity
    /// exceeds the stock available at commit time, and with
    /// [`StoreError::NotFound`] if a product vanished or was archived.
    ///
    /// [`StoreError::StockConflict`]: crate::StoreError::StockConflict
    /// [`StoreError::NotFound`]: crate::StoreError::NotFound
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord>;

    /// Looks up an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Returns the items of an order.
    async fn get_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Lists orders matching the query, newest first.
    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<OrderRecord>>;

    /// Sets an order's status and appends the matching history row in the
    /// same transaction. Transition legality is the caller's concern.
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        changed_by: Option<UserId>,
    ) -> Result<OrderRecord>;

    /// Returns the status history of an order, oldest first.
    async fn status_history(&self, order_id: OrderId) -> Result<Vec<StatusHistoryRecord>>;

    /// Returns the distinct vendors whose products appear in an order.
    /// Consulted by vendor-side authorization checks.
    async fn order_vendor_ids(&self, order_id: OrderId) -> Result<Vec<VendorId>>;

    // -- Payments --

    /// Idempotently applies payment fields to an order. `None` fields of
    /// the update keep their stored values.
    async fn upsert_payment(&self, id: OrderId, update: PaymentUpdate) -> Result<OrderRecord>;

    /// Appends one row to the payment attempt log.
    async fn insert_payment_log(&self, log: NewPaymentLog) -> Result<PaymentLogRecord>;

    /// Returns all payment attempts for an order, oldest first.
    async fn payment_logs_for_order(&self, order_id: OrderId) -> Result<Vec<PaymentLogRecord>>;

    /// Finds the order carrying the given transaction id, if any.
    async fn find_order_by_transaction(&self, transaction_id: &str) -> Result<Option<OrderRecord>>;

    // -- Reviews --

    /// Inserts a review. At most one review may exist per
    /// (user, product, order) triple; violations fail with
    /// [`StoreError::DuplicateReview`].
    ///
    /// [`StoreError::DuplicateReview`]: crate::StoreError::DuplicateReview
    async fn insert_review(&self, review: NewReview) -> Result<ReviewRecord>;

    /// Returns reviews for a product, newest first.
    async fn reviews_for_product(&self, product_id: ProductId) -> Result<Vec<ReviewRecord>>;

    // -- Notifications --

    /// Inserts a single notification.
    async fn insert_notification(&self, notification: NewNotification)
    -> Result<NotificationRecord>;

    /// Inserts a batch of notifications atomically and returns the count.
    async fn insert_notifications(&self, notifications: Vec<NewNotification>) -> Result<u64>;

    /// Returns a user's notifications, newest first.
    async fn notifications_for_user(&self, user_id: UserId) -> Result<Vec<NotificationRecord>>;

    /// Marks a notification as read.
    async fn mark_notification_read(&self, id: Uuid) -> Result<()>;

    // -- Audit --

    /// Appends an entry to the audit trail.
    async fn insert_audit(&self, entry: NewAuditEntry) -> Result<AuditLogRecord>;

    /// Returns audit entries touching the given table, newest first.
    async fn audit_for_table(&self, table_name: &str) -> Result<Vec<AuditLogRecord>>;
}
