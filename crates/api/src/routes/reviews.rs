//! Review submission endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{OrderId, ProductId};
use serde::Deserialize;
use store::MarketStore;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::AuthActor;
use crate::routes::products::ReviewResponse;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

/// POST /reviews — review a product received on a delivered order.
#[tracing::instrument(skip(state, actor, req), fields(user_id = %actor.0.user_id))]
pub async fn create<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let review = state
        .reviews
        .submit(
            &actor.0,
            OrderId::from_uuid(req.order_id),
            ProductId::from_uuid(req.product_id),
            req.rating,
            req.comment,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(review.into())))
}
