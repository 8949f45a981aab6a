//! Cart endpoints. Carts live in memory, keyed by the authenticated user.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::Cart;
use serde::{Deserialize, Serialize};
use store::MarketStore;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::AuthActor;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub subtotal_cents: i64,
    pub item_count: u32,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        let subtotal_cents = cart.subtotal().cents();
        let item_count = cart.item_count();
        Self {
            lines: cart
                .lines
                .into_iter()
                .map(|line| CartLineResponse {
                    product_id: line.product_id,
                    product_name: line.product_name,
                    unit_price_cents: line.unit_price.cents(),
                    line_total_cents: line.unit_price.times(line.quantity).cents(),
                    quantity: line.quantity,
                })
                .collect(),
            subtotal_cents,
            item_count,
        }
    }
}

// -- Handlers --

/// GET /cart — the caller's current cart.
pub async fn get_cart<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.get(actor.0.user_id).await;
    Ok(Json(cart.into()))
}

/// POST /cart/items — add a product, merging with any existing line.
pub async fn add_item<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let cart = state
        .carts
        .add(
            actor.0.user_id,
            ProductId::from_uuid(req.product_id),
            req.quantity,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

/// PUT /cart/items/{product_id} — set a line's quantity; zero removes it.
pub async fn update_item<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .carts
        .update_quantity(
            actor.0.user_id,
            ProductId::from_uuid(product_id),
            req.quantity,
        )
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/items/{product_id} — remove a line.
pub async fn remove_item<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .carts
        .remove(actor.0.user_id, ProductId::from_uuid(product_id))
        .await?;
    Ok(Json(cart.into()))
}
