use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, OrderStatus, ProductId, Role, UserId, VendorId};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::query::{OrderQuery, ProductQuery};
use crate::records::{
    AuditLogRecord, CategoryRecord, NewAuditEntry, NewNotification, NewOrder, NewPaymentLog,
    NewProduct, NewReview, NewUser, NewVendor, NotificationRecord, OrderItemRecord, OrderRecord,
    PaymentLogRecord, PaymentUpdate, ProductRecord, ProductUpdate, ReviewRecord,
    StatusHistoryRecord, UserRecord, VendorRecord,
};
use crate::store::MarketStore;
use crate::{Result, StoreError};

#[derive(Default)]
struct State {
    users: HashMap<UserId, UserRecord>,
    categories: HashMap<Uuid, CategoryRecord>,
    vendors: HashMap<VendorId, VendorRecord>,
    products: HashMap<ProductId, ProductRecord>,
    orders: HashMap<OrderId, OrderRecord>,
    order_items: Vec<OrderItemRecord>,
    history: Vec<StatusHistoryRecord>,
    payment_logs: Vec<PaymentLogRecord>,
    reviews: Vec<ReviewRecord>,
    notifications: Vec<NotificationRecord>,
    audit: Vec<AuditLogRecord>,
    audit_seq: i64,
    fail_audits: bool,
}

/// In-memory market store for testing and development.
///
/// All mutations run under a single write lock, which gives `create_order`
/// the same all-or-nothing stock guarantee the Postgres backend gets from
/// row locking: a concurrent checkout of the last unit sees either the
/// original stock or the committed decrement, never an intermediate state.
#[derive(Clone, Default)]
pub struct InMemoryMarketStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryMarketStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total notification rows across all users.
    pub async fn notification_count(&self) -> usize {
        self.state.read().await.notifications.len()
    }

    /// Total audit entries.
    pub async fn audit_count(&self) -> usize {
        self.state.read().await.audit.len()
    }

    /// Configures audit inserts to fail. Used to verify that the sink
    /// swallows audit failures without failing its caller.
    pub async fn set_fail_audits(&self, fail: bool) {
        self.state.write().await.fail_audits = fail;
    }
}

fn product_matches(product: &ProductRecord, query: &ProductQuery) -> bool {
    if let Some(vendor_id) = query.vendor_id
        && product.vendor_id != vendor_id
    {
        return false;
    }
    if let Some(category_id) = query.category_id
        && product.category_id != Some(category_id)
    {
        return false;
    }
    if let Some(featured) = query.featured
        && product.featured != featured
    {
        return false;
    }
    if let Some(ref term) = query.search
        && !product.name.to_lowercase().contains(&term.to_lowercase())
    {
        return false;
    }
    true
}

fn page<T>(items: Vec<T>, limit: Option<u32>, offset: Option<u32>) -> Vec<T> {
    let offset = offset.unwrap_or(0) as usize;
    let limit = limit.map(|l| l as usize).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord> {
        let record = UserRecord {
            id: UserId::new(),
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .users
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<UserRecord>> {
        let state = self.state.read().await;
        let mut users: Vec<_> = state
            .users
            .values()
            .filter(|u| u.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn insert_category(&self, name: &str) -> Result<CategoryRecord> {
        let record = CategoryRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.state
            .write()
            .await
            .categories
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_vendor(&self, vendor: NewVendor) -> Result<VendorRecord> {
        let record = VendorRecord {
            id: VendorId::new(),
            user_id: vendor.user_id,
            business_name: vendor.business_name,
            tier: vendor.tier,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .vendors
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_vendor(&self, id: VendorId) -> Result<Option<VendorRecord>> {
        Ok(self.state.read().await.vendors.get(&id).cloned())
    }

    async fn count_active_products(&self, vendor_id: VendorId) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .filter(|p| p.vendor_id == vendor_id && p.is_active())
            .count() as u64)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<ProductRecord> {
        let record = ProductRecord {
            id: ProductId::new(),
            vendor_id: product.vendor_id,
            category_id: product.category_id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            image_url: product.image_url,
            featured: product.featured,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.state
            .write()
            .await
            .products
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).filter(|p| p.is_active()).cloned())
    }

    async fn list_products(&self, query: ProductQuery) -> Result<Vec<ProductRecord>> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state
            .products
            .values()
            .filter(|p| p.is_active() && product_matches(p, &query))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(page(products, query.limit, query.offset))
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<ProductRecord> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .filter(|p| p.is_active())
            .ok_or_else(|| StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            })?;
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(stock) = update.stock {
            product.stock = stock;
        }
        if let Some(image_url) = update.image_url {
            product.image_url = Some(image_url);
        }
        if let Some(featured) = update.featured {
            product.featured = featured;
        }
        Ok(product.clone())
    }

    async fn archive_product(&self, id: ProductId) -> Result<()> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .filter(|p| p.is_active())
            .ok_or_else(|| StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            })?;
        product.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord> {
        let mut state = self.state.write().await;

        // Validate every line before touching anything.
        for line in &order.lines {
            let product = state
                .products
                .get(&line.product_id)
                .filter(|p| p.is_active())
                .ok_or_else(|| StoreError::NotFound {
                    entity: "product",
                    id: line.product_id.to_string(),
                })?;
            if product.stock < line.quantity {
                return Err(StoreError::StockConflict {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: product.stock,
                });
            }
        }

        let now = Utc::now();
        for line in &order.lines {
            let product = state
                .products
                .get_mut(&line.product_id)
                .ok_or_else(|| StoreError::NotFound {
                    entity: "product",
                    id: line.product_id.to_string(),
                })?;
            product.stock -= line.quantity;
        }

        let record = OrderRecord {
            id: order.id,
            user_id: order.user_id,
            status: OrderStatus::Pending,
            payment_status: common::PaymentStatus::Pending,
            subtotal: order.subtotal,
            tax: order.tax,
            shipping: order.shipping,
            total: order.total,
            shipping_address: order.shipping_address,
            payment_method: Some(order.payment_method),
            transaction_id: None,
            created_at: now,
            deleted_at: None,
        };
        for line in &order.lines {
            state.order_items.push(OrderItemRecord {
                order_id: order.id,
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }
        state.history.push(StatusHistoryRecord {
            order_id: order.id,
            status: OrderStatus::Pending,
            changed_by: Some(order.user_id),
            changed_at: now,
        });
        state.orders.insert(order.id, record.clone());
        Ok(record)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .get(&id)
            .filter(|o| o.deleted_at.is_none())
            .cloned())
    }

    async fn get_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let state = self.state.read().await;
        Ok(state
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.deleted_at.is_none())
            .filter(|o| query.user_id.is_none_or(|u| o.user_id == u))
            .filter(|o| query.status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(orders, query.limit, query.offset))
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        changed_by: Option<UserId>,
    ) -> Result<OrderRecord> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .filter(|o| o.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound {
                entity: "order",
                id: id.to_string(),
            })?;
        order.status = status;
        let record = order.clone();
        state.history.push(StatusHistoryRecord {
            order_id: id,
            status,
            changed_by,
            changed_at: Utc::now(),
        });
        Ok(record)
    }

    async fn status_history(&self, order_id: OrderId) -> Result<Vec<StatusHistoryRecord>> {
        let state = self.state.read().await;
        Ok(state
            .history
            .iter()
            .filter(|h| h.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn order_vendor_ids(&self, order_id: OrderId) -> Result<Vec<VendorId>> {
        let state = self.state.read().await;
        let mut vendor_ids: Vec<VendorId> = state
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .filter_map(|i| state.products.get(&i.product_id))
            .map(|p| p.vendor_id)
            .collect();
        vendor_ids.sort_by_key(|v| v.as_uuid());
        vendor_ids.dedup();
        Ok(vendor_ids)
    }

    async fn upsert_payment(&self, id: OrderId, update: PaymentUpdate) -> Result<OrderRecord> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .filter(|o| o.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound {
                entity: "order",
                id: id.to_string(),
            })?;
        order.payment_status = update.status;
        if update.transaction_id.is_some() {
            order.transaction_id = update.transaction_id;
        }
        if update.method.is_some() {
            order.payment_method = update.method;
        }
        Ok(order.clone())
    }

    async fn insert_payment_log(&self, log: NewPaymentLog) -> Result<PaymentLogRecord> {
        let record = PaymentLogRecord {
            id: Uuid::new_v4(),
            order_id: log.order_id,
            method: log.method,
            amount: log.amount,
            transaction_id: log.transaction_id,
            status: log.status,
            response: log.response,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .payment_logs
            .push(record.clone());
        Ok(record)
    }

    async fn payment_logs_for_order(&self, order_id: OrderId) -> Result<Vec<PaymentLogRecord>> {
        let state = self.state.read().await;
        Ok(state
            .payment_logs
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn find_order_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<OrderRecord>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .filter(|o| o.deleted_at.is_none())
            .find(|o| o.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn insert_review(&self, review: NewReview) -> Result<ReviewRecord> {
        let mut state = self.state.write().await;
        let duplicate = state.reviews.iter().any(|r| {
            r.user_id == review.user_id
                && r.product_id == review.product_id
                && r.order_id == review.order_id
        });
        if duplicate {
            return Err(StoreError::DuplicateReview {
                user_id: review.user_id,
                product_id: review.product_id,
                order_id: review.order_id,
            });
        }
        let record = ReviewRecord {
            id: Uuid::new_v4(),
            user_id: review.user_id,
            product_id: review.product_id,
            order_id: review.order_id,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        };
        state.reviews.push(record.clone());
        Ok(record)
    }

    async fn reviews_for_product(&self, product_id: ProductId) -> Result<Vec<ReviewRecord>> {
        let state = self.state.read().await;
        let mut reviews: Vec<_> = state
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationRecord> {
        let record = NotificationRecord {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            message: notification.message,
            kind: notification.kind,
            read: false,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .notifications
            .push(record.clone());
        Ok(record)
    }

    async fn insert_notifications(&self, notifications: Vec<NewNotification>) -> Result<u64> {
        let mut state = self.state.write().await;
        let count = notifications.len() as u64;
        let now = Utc::now();
        for notification in notifications {
            state.notifications.push(NotificationRecord {
                id: Uuid::new_v4(),
                user_id: notification.user_id,
                message: notification.message,
                kind: notification.kind,
                read: false,
                created_at: now,
            });
        }
        Ok(count)
    }

    async fn notifications_for_user(&self, user_id: UserId) -> Result<Vec<NotificationRecord>> {
        let state = self.state.read().await;
        let mut notifications: Vec<_> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "notification",
                id: id.to_string(),
            })?;
        notification.read = true;
        Ok(())
    }

    async fn insert_audit(&self, entry: NewAuditEntry) -> Result<AuditLogRecord> {
        let mut state = self.state.write().await;
        if state.fail_audits {
            return Err(StoreError::Decode("audit writes disabled".to_string()));
        }
        state.audit_seq += 1;
        let record = AuditLogRecord {
            id: state.audit_seq,
            user_id: entry.user_id,
            action: entry.action,
            table_name: entry.table_name,
            record_id: entry.record_id,
            details: entry.details,
            created_at: Utc::now(),
        };
        state.audit.push(record.clone());
        Ok(record)
    }

    async fn audit_for_table(&self, table_name: &str) -> Result<Vec<AuditLogRecord>> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .audit
            .iter()
            .filter(|a| a.table_name == table_name)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(entries)
    }
}
