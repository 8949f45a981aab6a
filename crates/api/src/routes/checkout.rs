//! Checkout endpoint: cart to order to payment in one request.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use checkout::PaymentDetails;
use common::{PaymentMethod, PaymentStatus};
use serde::{Deserialize, Serialize};
use store::MarketStore;

use crate::error::ApiError;
use crate::extract::AuthActor;
use crate::routes::orders::OrderResponse;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: serde_json::Value,
    pub payment_method: PaymentMethod,
    /// Method-specific credentials; defaults to none for deferred methods.
    #[serde(default)]
    pub payment_details: PaymentDetails,
}

// -- Response types --

#[derive(Serialize)]
pub struct PaymentOutcomeResponse {
    pub approved: bool,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub message: String,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub payment: PaymentOutcomeResponse,
}

// -- Handlers --

/// POST /checkout — convert the caller's cart into an order and charge it.
///
/// Returns 201 even when the charge is declined: the order survives with
/// `payment_status = failed` and the payment can be retried.
#[tracing::instrument(skip(state, actor, req), fields(user_id = %actor.0.user_id))]
pub async fn checkout<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let receipt = state
        .coordinator
        .checkout(
            &actor.0,
            req.shipping_address,
            req.payment_method,
            req.payment_details,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order: receipt.order.into(),
            payment: PaymentOutcomeResponse {
                approved: receipt.payment.approved,
                transaction_id: receipt.payment.transaction_id,
                status: receipt.payment.status,
                message: receipt.payment.message,
            },
        }),
    ))
}
