use async_trait::async_trait;
use chrono::Utc;
use common::{
    Money, NotificationKind, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, Role,
    SubscriptionTier, UserId, VendorId,
};
use sqlx::{PgPool, Row, postgres::PgRow};
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

/// PostgreSQL-backed market store implementation.
#[derive(Clone)]
pub struct PostgresMarketStore {
    pool: PgPool,
}

impl PostgresMarketStore {
    /// Creates a new PostgreSQL market store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_user(row: PgRow) -> Result<UserRecord> {
        Ok(UserRecord {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            role: Role::parse(row.try_get::<String, _>("role")?.as_str())?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_vendor(row: PgRow) -> Result<VendorRecord> {
        Ok(VendorRecord {
            id: VendorId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            business_name: row.try_get("business_name")?,
            tier: SubscriptionTier::parse(row.try_get::<String, _>("tier")?.as_str())?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<ProductRecord> {
        Ok(ProductRecord {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            vendor_id: VendorId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
            category_id: row.try_get("category_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get::<i32, _>("stock")? as u32,
            image_url: row.try_get("image_url")?,
            featured: row.try_get("featured")?,
            created_at: row.try_get("created_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<OrderRecord> {
        let method: Option<String> = row.try_get("payment_method")?;
        Ok(OrderRecord {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status: OrderStatus::parse(row.try_get::<String, _>("status")?.as_str())?,
            payment_status: PaymentStatus::parse(
                row.try_get::<String, _>("payment_status")?.as_str(),
            )?,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            tax: Money::from_cents(row.try_get("tax_cents")?),
            shipping: Money::from_cents(row.try_get("shipping_cents")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            shipping_address: row.try_get("shipping_address")?,
            payment_method: method.map(|m| PaymentMethod::parse(&m)).transpose()?,
            transaction_id: row.try_get("transaction_id")?,
            created_at: row.try_get("created_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItemRecord> {
        Ok(OrderItemRecord {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_history(row: PgRow) -> Result<StatusHistoryRecord> {
        Ok(StatusHistoryRecord {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            status: OrderStatus::parse(row.try_get::<String, _>("status")?.as_str())?,
            changed_by: row
                .try_get::<Option<Uuid>, _>("changed_by")?
                .map(UserId::from_uuid),
            changed_at: row.try_get("changed_at")?,
        })
    }

    fn row_to_payment_log(row: PgRow) -> Result<PaymentLogRecord> {
        Ok(PaymentLogRecord {
            id: row.try_get("id")?,
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            method: PaymentMethod::parse(row.try_get::<String, _>("method")?.as_str())?,
            amount: Money::from_cents(row.try_get("amount_cents")?),
            transaction_id: row.try_get("transaction_id")?,
            status: PaymentStatus::parse(row.try_get::<String, _>("status")?.as_str())?,
            response: row.try_get("response")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_review(row: PgRow) -> Result<ReviewRecord> {
        Ok(ReviewRecord {
            id: row.try_get("id")?,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            rating: row.try_get("rating")?,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_notification(row: PgRow) -> Result<NotificationRecord> {
        Ok(NotificationRecord {
            id: row.try_get("id")?,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            message: row.try_get("message")?,
            kind: NotificationKind::parse(row.try_get::<String, _>("kind")?.as_str())?,
            read: row.try_get("read")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_audit(row: PgRow) -> Result<AuditLogRecord> {
        Ok(AuditLogRecord {
            id: row.try_get("id")?,
            user_id: row
                .try_get::<Option<Uuid>, _>("user_id")?
                .map(UserId::from_uuid),
            action: row.try_get("action")?,
            table_name: row.try_get("table_name")?,
            record_id: row.try_get("record_id")?,
            details: row.try_get("details")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, status, payment_status, subtotal_cents, tax_cents, \
     shipping_cents, total_cents, shipping_address, payment_method, transaction_id, \
     created_at, deleted_at";

const PRODUCT_COLUMNS: &str = "id, vendor_id, category_id, name, description, price_cents, \
     stock, image_url, featured, created_at, deleted_at";

#[async_trait]
impl MarketStore for PostgresMarketStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, email, name, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, name, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_user(row)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        let row = sqlx::query("SELECT id, email, name, role, created_at FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<UserRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, email, name, role, created_at
            FROM users
            WHERE role = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_user).collect()
    }

    async fn insert_category(&self, name: &str) -> Result<CategoryRecord> {
        let row = sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id, name")
            .bind(Uuid::new_v4())
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(CategoryRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }

    async fn insert_vendor(&self, vendor: NewVendor) -> Result<VendorRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO vendors (id, user_id, business_name, tier, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, business_name, tier, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(vendor.user_id.as_uuid())
        .bind(&vendor.business_name)
        .bind(vendor.tier.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_vendor(row)
    }

    async fn get_vendor(&self, id: VendorId) -> Result<Option<VendorRecord>> {
        let row = sqlx::query(
            "SELECT id, user_id, business_name, tier, created_at FROM vendors WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_vendor).transpose()
    }

    async fn count_active_products(&self, vendor_id: VendorId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE vendor_id = $1 AND deleted_at IS NULL",
        )
        .bind(vendor_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<ProductRecord> {
        let sql = format!(
            r#"
            INSERT INTO products (id, vendor_id, category_id, name, description, price_cents,
                                  stock, image_url, featured, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(product.vendor_id.as_uuid())
            .bind(product.category_id)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price.cents())
            .bind(product.stock as i32)
            .bind(&product.image_url)
            .bind(product.featured)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        Self::row_to_product(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>> {
        let sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND deleted_at IS NULL");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self, query: ProductQuery) -> Result<Vec<ProductRecord>> {
        let mut sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE deleted_at IS NULL");
        let mut param_count = 0;

        // Build dynamic query
        if query.vendor_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND vendor_id = ${param_count}"));
        }
        if query.category_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category_id = ${param_count}"));
        }
        if query.featured.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND featured = ${param_count}"));
        }
        if query.search.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND name ILIKE ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at ASC, name ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(vendor_id) = query.vendor_id {
            sqlx_query = sqlx_query.bind(vendor_id.as_uuid());
        }
        if let Some(category_id) = query.category_id {
            sqlx_query = sqlx_query.bind(category_id);
        }
        if let Some(featured) = query.featured {
            sqlx_query = sqlx_query.bind(featured);
        }
        if let Some(term) = query.search {
            sqlx_query = sqlx_query.bind(format!("%{term}%"));
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<ProductRecord> {
        let sql = format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_cents = COALESCE($4, price_cents),
                stock = COALESCE($5, stock),
                image_url = COALESCE($6, image_url),
                featured = COALESCE($7, featured)
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(&update.name)
            .bind(&update.description)
            .bind(update.price.map(|p| p.cents()))
            .bind(update.stock.map(|s| s as i32))
            .bind(&update.image_url)
            .bind(update.featured)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            })?;

        Self::row_to_product(row)
    }

    async fn archive_product(&self, id: ProductId) -> Result<()> {
        let result =
            sqlx::query("UPDATE products SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
                .bind(id.as_uuid())
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "product",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord> {
        let mut tx = self.pool.begin().await?;

        // Lock products in sorted id order so concurrent checkouts of
        // overlapping carts cannot deadlock.
        let mut product_ids: Vec<Uuid> =
            order.lines.iter().map(|l| l.product_id.as_uuid()).collect();
        product_ids.sort();
        product_ids.dedup();

        for product_id in &product_ids {
            let row = sqlx::query(
                "SELECT stock FROM products WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            )
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            })?;

            let available = row.try_get::<i32, _>("stock")? as u32;
            let requested: u32 = order
                .lines
                .iter()
                .filter(|l| l.product_id.as_uuid() == *product_id)
                .map(|l| l.quantity)
                .sum();

            if available < requested {
                return Err(StoreError::StockConflict {
                    product_id: ProductId::from_uuid(*product_id),
                    requested,
                    available,
                });
            }

            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
                .bind(product_id)
                .bind(requested as i32)
                .execute(&mut *tx)
                .await?;
        }

        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO orders (id, user_id, status, payment_status, subtotal_cents, tax_cents,
                                shipping_cents, total_cents, shipping_address, payment_method,
                                created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(order.id.as_uuid())
            .bind(order.user_id.as_uuid())
            .bind(OrderStatus::Pending.as_str())
            .bind(PaymentStatus::Pending.as_str())
            .bind(order.subtotal.cents())
            .bind(order.tax.cents())
            .bind(order.shipping.cents())
            .bind(order.total.cents())
            .bind(&order.shipping_address)
            .bind(order.payment_method.as_str())
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(&line.product_name)
            .bind(line.quantity as i32)
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO order_status_history (order_id, status, changed_by, changed_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(OrderStatus::Pending.as_str())
        .bind(order.user_id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Self::row_to_order(row)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let sql =
            format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND deleted_at IS NULL");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE deleted_at IS NULL");
        let mut param_count = 0;

        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(user_id) = query.user_id {
            sqlx_query = sqlx_query.bind(user_id.as_uuid());
        }
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        changed_by: Option<UserId>,
    ) -> Result<OrderRecord> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE orders SET status = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(status.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "order",
                id: id.to_string(),
            })?;

        sqlx::query(
            r#"
            INSERT INTO order_status_history (order_id, status, changed_by, changed_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(changed_by.map(|u| u.as_uuid()))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Self::row_to_order(row)
    }

    async fn status_history(&self, order_id: OrderId) -> Result<Vec<StatusHistoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, status, changed_by, changed_at
            FROM order_status_history
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_history).collect()
    }

    async fn order_vendor_ids(&self, order_id: OrderId) -> Result<Vec<VendorId>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT p.vendor_id
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY p.vendor_id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(VendorId::from_uuid(
                    row.try_get::<Uuid, _>("vendor_id")?,
                ))
            })
            .collect()
    }

    async fn upsert_payment(&self, id: OrderId, update: PaymentUpdate) -> Result<OrderRecord> {
        let sql = format!(
            r#"
            UPDATE orders SET
                payment_status = $2,
                transaction_id = COALESCE($3, transaction_id),
                payment_method = COALESCE($4, payment_method)
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(update.status.as_str())
            .bind(&update.transaction_id)
            .bind(update.method.map(|m| m.as_str()))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "order",
                id: id.to_string(),
            })?;

        Self::row_to_order(row)
    }

    async fn insert_payment_log(&self, log: NewPaymentLog) -> Result<PaymentLogRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO payment_logs (id, order_id, method, amount_cents, transaction_id, status,
                                      response, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, order_id, method, amount_cents, transaction_id, status, response, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(log.order_id.as_uuid())
        .bind(log.method.as_str())
        .bind(log.amount.cents())
        .bind(&log.transaction_id)
        .bind(log.status.as_str())
        .bind(&log.response)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_payment_log(row)
    }

    async fn payment_logs_for_order(&self, order_id: OrderId) -> Result<Vec<PaymentLogRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, method, amount_cents, transaction_id, status, response, created_at
            FROM payment_logs
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_payment_log).collect()
    }

    async fn find_order_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<OrderRecord>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE transaction_id = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn insert_review(&self, review: NewReview) -> Result<ReviewRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, product_id, order_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, product_id, order_id, rating, comment, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(review.user_id.as_uuid())
        .bind(review.product_id.as_uuid())
        .bind(review.order_id.as_uuid())
        .bind(review.rating)
        .bind(&review.comment)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // One review per (user, product, order) triple
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("uniq_review_per_order")
            {
                return StoreError::DuplicateReview {
                    user_id: review.user_id,
                    product_id: review.product_id,
                    order_id: review.order_id,
                };
            }
            StoreError::Database(e)
        })?;

        Self::row_to_review(row)
    }

    async fn reviews_for_product(&self, product_id: ProductId) -> Result<Vec<ReviewRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, product_id, order_id, rating, comment, created_at
            FROM reviews
            WHERE product_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_review).collect()
    }

    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, message, kind, read, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING id, user_id, message, kind, read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification.user_id.as_uuid())
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_notification(row)
    }

    async fn insert_notifications(&self, notifications: Vec<NewNotification>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let count = notifications.len() as u64;

        for notification in &notifications {
            sqlx::query(
                r#"
                INSERT INTO notifications (id, user_id, message, kind, read, created_at)
                VALUES ($1, $2, $3, $4, FALSE, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(notification.user_id.as_uuid())
            .bind(&notification.message)
            .bind(notification.kind.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(count)
    }

    async fn notifications_for_user(&self, user_id: UserId) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, message, kind, read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "notification",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_audit(&self, entry: NewAuditEntry) -> Result<AuditLogRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, action, table_name, record_id, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, action, table_name, record_id, details, created_at
            "#,
        )
        .bind(entry.user_id.map(|u| u.as_uuid()))
        .bind(&entry.action)
        .bind(&entry.table_name)
        .bind(&entry.record_id)
        .bind(&entry.details)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_audit(row)
    }

    async fn audit_for_table(&self, table_name: &str) -> Result<Vec<AuditLogRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, action, table_name, record_id, details, created_at
            FROM audit_logs
            WHERE table_name = $1
            ORDER BY id DESC
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_audit).collect()
    }
}
