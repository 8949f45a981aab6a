use std::sync::Arc;

use common::{NotificationKind, OrderId, OrderStatus, PaymentMethod, Role};
use notify::AuditTrail;
use store::{
    MarketStore, NewNotification, NewOrder, NewOrderLine, OrderItemRecord, OrderQuery, OrderRecord,
};

use crate::auth::Actor;
use crate::cart::Cart;
use crate::error::{DomainError, Result};
use crate::pricing::PricingPolicy;

/// Order lifecycle: checkout conversion, the status state machine and
/// cancellation.
///
/// Checkout re-snapshots every cart line against the live product (name and
/// unit price at purchase time), prices the order through the canonical
/// policy, and hands the whole thing to the store's atomic `create_order`.
/// Status mutations validate against the transition graph before anything
/// is written, and every committed transition appends one history row.
pub struct OrderService<S> {
    store: Arc<S>,
    pricing: PricingPolicy,
    audit: AuditTrail<S>,
}

impl<S> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            pricing: self.pricing,
            audit: self.audit.clone(),
        }
    }
}

impl<S: MarketStore> OrderService<S> {
    pub fn new(store: Arc<S>, pricing: PricingPolicy) -> Self {
        let audit = AuditTrail::new(store.clone());
        Self {
            store,
            pricing,
            audit,
        }
    }

    /// Converts a cart into a pending order.
    ///
    /// Stock is re-validated inside the store's transaction; a conflicting
    /// concurrent checkout surfaces as [`DomainError::StockConflict`] and
    /// leaves nothing behind.
    #[tracing::instrument(skip(self, actor, cart, shipping_address), fields(user_id = %actor.user_id))]
    pub async fn place_order(
        &self,
        actor: &Actor,
        cart: &Cart,
        shipping_address: serde_json::Value,
        payment_method: PaymentMethod,
    ) -> Result<OrderRecord> {
        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        if !shipping_address.is_object() {
            return Err(DomainError::Validation(
                "shipping address must be a JSON object".to_string(),
            ));
        }

        // Re-snapshot names and prices from the live catalog; cart prices
        // are display-only and may be stale.
        let mut lines = Vec::with_capacity(cart.lines.len());
        for cart_line in &cart.lines {
            let product = self
                .store
                .get_product(cart_line.product_id)
                .await?
                .ok_or_else(|| DomainError::NotFound {
                    entity: "product",
                    id: cart_line.product_id.to_string(),
                })?;
            lines.push(NewOrderLine {
                product_id: product.id,
                product_name: product.name,
                quantity: cart_line.quantity,
                unit_price: product.price,
            });
        }

        let subtotal = lines
            .iter()
            .map(|l| l.unit_price.times(l.quantity))
            .sum();
        let totals = self.pricing.quote(subtotal);

        let order = self
            .store
            .create_order(NewOrder {
                id: OrderId::new(),
                user_id: actor.user_id,
                lines,
                shipping_address,
                payment_method,
                subtotal: totals.subtotal,
                tax: totals.tax,
                shipping: totals.shipping,
                total: totals.total,
            })
            .await?;

        metrics::counter!("orders_created_total").increment(1);
        self.audit
            .record(store::NewAuditEntry {
                user_id: Some(actor.user_id),
                action: "create".to_string(),
                table_name: "orders".to_string(),
                record_id: Some(order.id.to_string()),
                details: serde_json::json!({ "total_cents": order.total.cents() }),
            })
            .await;

        Ok(order)
    }

    /// Moves an order to `next`, rejecting illegal transitions.
    ///
    /// Allowed for staff/admin and for vendors whose products appear in the
    /// order. Customers cancel through [`OrderService::cancel`] instead.
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id, next = %next))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<OrderRecord> {
        let order = self.load(order_id).await?;

        if !actor.is_staff() {
            if actor.role != Role::Vendor {
                return Err(DomainError::PermissionDenied(
                    "customers cannot set order status directly".to_string(),
                ));
            }
            let vendor_id = actor.vendor_id.ok_or_else(|| {
                DomainError::PermissionDenied("vendor account required".to_string())
            })?;
            let vendors = self.store.order_vendor_ids(order_id).await?;
            if !vendors.contains(&vendor_id) {
                return Err(DomainError::PermissionDenied(
                    "order contains no products of this vendor".to_string(),
                ));
            }
        }

        self.apply_transition(actor, &order, next).await
    }

    /// Customer-initiated cancellation, allowed only while the order is
    /// pending or processing. Staff may cancel any order the state machine
    /// still allows.
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn cancel(&self, actor: &Actor, order_id: OrderId) -> Result<OrderRecord> {
        let order = self.load(order_id).await?;

        if !actor.is_staff() {
            if order.user_id != actor.user_id {
                return Err(DomainError::PermissionDenied(
                    "order belongs to another customer".to_string(),
                ));
            }
            if !order.status.customer_can_cancel() {
                return Err(DomainError::InvalidTransition {
                    from: order.status,
                    to: OrderStatus::Cancelled,
                });
            }
        }

        self.apply_transition(actor, &order, OrderStatus::Cancelled)
            .await
    }

    /// Returns an order visible to the actor: its owner, a vendor with
    /// products in it, or staff.
    pub async fn get_order(&self, actor: &Actor, order_id: OrderId) -> Result<OrderRecord> {
        let order = self.load(order_id).await?;
        self.authorize_view(actor, &order).await?;
        Ok(order)
    }

    pub async fn get_order_items(
        &self,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<Vec<OrderItemRecord>> {
        let order = self.load(order_id).await?;
        self.authorize_view(actor, &order).await?;
        Ok(self.store.get_order_items(order_id).await?)
    }

    /// Lists orders. Customers only ever see their own regardless of the
    /// query they send.
    pub async fn list_orders(&self, actor: &Actor, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let query = if actor.is_staff() {
            query
        } else {
            query.user(actor.user_id)
        };
        Ok(self.store.list_orders(query).await?)
    }

    async fn load(&self, order_id: OrderId) -> Result<OrderRecord> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "order",
                id: order_id.to_string(),
            })
    }

    async fn authorize_view(&self, actor: &Actor, order: &OrderRecord) -> Result<()> {
        if actor.is_staff() || order.user_id == actor.user_id {
            return Ok(());
        }
        if let Some(vendor_id) = actor.vendor_id {
            let vendors = self.store.order_vendor_ids(order.id).await?;
            if vendors.contains(&vendor_id) {
                return Ok(());
            }
        }
        Err(DomainError::PermissionDenied(
            "not a party to this order".to_string(),
        ))
    }

    async fn apply_transition(
        &self,
        actor: &Actor,
        order: &OrderRecord,
        next: OrderStatus,
    ) -> Result<OrderRecord> {
        if !order.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }

        let updated = self
            .store
            .update_order_status(order.id, next, Some(actor.user_id))
            .await?;
        metrics::counter!("order_status_changes_total", "status" => next.as_str()).increment(1);

        // Customer-facing notification is best effort, like the audit row.
        if let Err(e) = self
            .store
            .insert_notification(NewNotification {
                user_id: order.user_id,
                message: format!("Your order {} is now {next}", order.id),
                kind: NotificationKind::Order,
            })
            .await
        {
            tracing::warn!(error = %e, order_id = %order.id, "status notification failed");
        }
        self.audit
            .record(store::NewAuditEntry {
                user_id: Some(actor.user_id),
                action: "status_change".to_string(),
                table_name: "orders".to_string(),
                record_id: Some(order.id.to_string()),
                details: serde_json::json!({
                    "from": order.status.as_str(),
                    "to": next.as_str(),
                }),
            })
            .await;

        Ok(updated)
    }
}
