//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::{OrderId, OrderStatus, PaymentMethod, PaymentStatus, UserId};
use serde::{Deserialize, Serialize};
use store::{MarketStore, OrderItemRecord, OrderQuery, OrderRecord, StatusHistoryRecord};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::AuthActor;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct ListOrdersParams {
    pub status: Option<OrderStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub shipping_address: serde_json::Value,
    pub payment_method: Option<PaymentMethod>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<OrderRecord> for OrderResponse {
    fn from(record: OrderRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            status: record.status,
            payment_status: record.payment_status,
            subtotal_cents: record.subtotal.cents(),
            tax_cents: record.tax.cents(),
            shipping_cents: record.shipping.cents(),
            total_cents: record.total.cents(),
            shipping_address: record.shipping_address,
            payment_method: record.payment_method,
            transaction_id: record.transaction_id,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: common::ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<OrderItemRecord> for OrderItemResponse {
    fn from(record: OrderItemRecord) -> Self {
        let line_total_cents = record.line_total().cents();
        Self {
            product_id: record.product_id,
            product_name: record.product_name,
            quantity: record.quantity,
            unit_price_cents: record.unit_price.cents(),
            line_total_cents,
        }
    }
}

#[derive(Serialize)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct StatusHistoryResponse {
    pub status: OrderStatus,
    pub changed_by: Option<UserId>,
    pub changed_at: DateTime<Utc>,
}

impl From<StatusHistoryRecord> for StatusHistoryResponse {
    fn from(record: StatusHistoryRecord) -> Self {
        Self {
            status: record.status,
            changed_by: record.changed_by,
            changed_at: record.changed_at,
        }
    }
}

// -- Handlers --

/// GET /orders — list orders visible to the caller, newest first.
/// Customers only ever see their own.
pub async fn list<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let mut query = OrderQuery::new();
    if let Some(status) = params.status {
        query = query.status(status);
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let orders = state.orders.list_orders(&actor.0, query).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/{id} — one order with its items.
pub async fn get<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let order = state.orders.get_order(&actor.0, order_id).await?;
    let items = state.orders.get_order_items(&actor.0, order_id).await?;
    Ok(Json(OrderDetailResponse {
        order: order.into(),
        items: items.into_iter().map(Into::into).collect(),
    }))
}

/// GET /orders/{id}/history — the order's status trail, oldest first.
pub async fn history<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusHistoryResponse>>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    // get_order performs the visibility check
    state.orders.get_order(&actor.0, order_id).await?;
    let history = state.store.status_history(order_id).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

/// POST /orders/{id}/status — move an order along the status graph.
/// Allowed for staff and for vendors with products in the order.
#[tracing::instrument(skip(state, actor, req), fields(user_id = %actor.0.user_id))]
pub async fn update_status<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .update_status(&actor.0, OrderId::from_uuid(id), req.status)
        .await?;
    Ok(Json(order.into()))
}

/// POST /orders/{id}/cancel — customer-initiated cancellation while the
/// order is still pending or processing; staff may cancel later states too.
#[tracing::instrument(skip(state, actor), fields(user_id = %actor.0.user_id))]
pub async fn cancel<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.cancel(&actor.0, OrderId::from_uuid(id)).await?;
    Ok(Json(order.into()))
}
