//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Money, ProductId, VendorId};
use domain::NewProductInput;
use serde::{Deserialize, Serialize};
use store::{MarketStore, ProductQuery, ProductRecord, ProductUpdate};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::AuthActor;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct ListProductsParams {
    pub vendor_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub category_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    pub stock: u32,
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Deserialize, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<u32>,
    pub image_url: Option<String>,
    pub featured: Option<bool>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: u32,
    pub image_url: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ProductRecord> for ProductResponse {
    fn from(record: ProductRecord) -> Self {
        Self {
            id: record.id,
            vendor_id: record.vendor_id,
            category_id: record.category_id,
            name: record.name,
            description: record.description,
            price_cents: record.price.cents(),
            stock: record.stock,
            image_url: record.image_url,
            featured: record.featured,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub user_id: common::UserId,
    pub product_id: ProductId,
    pub order_id: common::OrderId,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<store::ReviewRecord> for ReviewResponse {
    fn from(record: store::ReviewRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            product_id: record.product_id,
            order_id: record.order_id,
            rating: record.rating,
            comment: record.comment,
            created_at: record.created_at,
        }
    }
}

// -- Handlers --

/// GET /products — list active products with optional filters.
pub async fn list<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListProductsParams>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let mut query = ProductQuery::new();
    if let Some(vendor_id) = params.vendor_id {
        query = query.vendor(VendorId::from_uuid(vendor_id));
    }
    if let Some(category_id) = params.category_id {
        query = query.category(category_id);
    }
    if let Some(featured) = params.featured {
        query = query.featured(featured);
    }
    if let Some(search) = params.search {
        query = query.search(search);
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = params.offset {
        query = query.offset(offset);
    }

    let products = state.catalog.list_products(query).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /products/{id} — fetch one active product.
pub async fn get<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.catalog.get_product(ProductId::from_uuid(id)).await?;
    Ok(Json(product.into()))
}

/// POST /products — list a product under the caller's vendor account.
#[tracing::instrument(skip(state, actor, req), fields(user_id = %actor.0.user_id))]
pub async fn create<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state
        .catalog
        .create_product(
            &actor.0,
            NewProductInput {
                category_id: req.category_id,
                name: req.name,
                description: req.description,
                price: Money::from_cents(req.price_cents),
                stock: req.stock,
                image_url: req.image_url,
                featured: req.featured,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// PUT /products/{id} — partial update by the owning vendor or staff.
pub async fn update<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let update = ProductUpdate {
        name: req.name,
        description: req.description,
        price: req.price_cents.map(Money::from_cents),
        stock: req.stock,
        image_url: req.image_url,
        featured: req.featured,
    };
    let product = state
        .catalog
        .update_product(&actor.0, ProductId::from_uuid(id), update)
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /products/{id} — soft-delete by the owning vendor or staff.
pub async fn archive<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .archive_product(&actor.0, ProductId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /products/{id}/reviews — reviews for a product, newest first.
pub async fn reviews<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let reviews = state
        .reviews
        .reviews_for_product(ProductId::from_uuid(id))
        .await?;
    Ok(Json(reviews.into_iter().map(Into::into).collect()))
}
