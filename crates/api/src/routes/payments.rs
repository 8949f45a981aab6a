//! Payment verification and manual settlement endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{OrderId, PaymentStatus};
use serde::Deserialize;
use store::MarketStore;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::AuthActor;
use crate::routes::orders::OrderResponse;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub status: PaymentStatus,
}

/// GET /payments/{transaction_id} — find the order behind a transaction.
/// Visible to the order's owner and to staff.
pub async fn verify<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Path(transaction_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.processor.verify_status(&transaction_id).await?;
    if !actor.0.is_staff() && order.user_id != actor.0.user_id {
        return Err(ApiError::Domain(domain::DomainError::PermissionDenied(
            "transaction belongs to another customer".to_string(),
        )));
    }
    Ok(Json(order.into()))
}

/// POST /orders/{id}/payment-status — staff-only settlement confirmations
/// and refunds, validated against the payment transition graph.
#[tracing::instrument(skip(state, actor, req), fields(user_id = %actor.0.user_id))]
pub async fn update_status<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePaymentStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    if !actor.0.is_staff() {
        return Err(ApiError::Domain(domain::DomainError::PermissionDenied(
            "only staff may set payment status".to_string(),
        )));
    }
    let order = state
        .processor
        .update_payment_status(OrderId::from_uuid(id), req.status)
        .await?;
    Ok(Json(order.into()))
}
