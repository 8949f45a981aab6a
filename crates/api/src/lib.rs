//! HTTP API for the marketplace order and payment lifecycle.
//!
//! Exposes the catalog, cart, checkout, order, payment, review and
//! notification operations over REST, with structured logging (tracing)
//! and Prometheus metrics. Caller identity arrives on `X-User-Id`,
//! `X-Role` and `X-Vendor-Id` headers; see [`extract`].

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::MarketStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, create_default_state, create_state};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", get(routes::products::list::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/{id}", put(routes::products::update::<S>))
        .route("/products/{id}", delete(routes::products::archive::<S>))
        .route("/products/{id}/reviews", get(routes::products::reviews::<S>))
        .route("/cart", get(routes::cart::get_cart::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route("/cart/items/{product_id}", put(routes::cart::update_item::<S>))
        .route(
            "/cart/items/{product_id}",
            delete(routes::cart::remove_item::<S>),
        )
        .route("/checkout", post(routes::checkout::checkout::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/history", get(routes::orders::history::<S>))
        .route("/orders/{id}/status", post(routes::orders::update_status::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route(
            "/orders/{id}/payment-status",
            post(routes::payments::update_status::<S>),
        )
        .route(
            "/payments/{transaction_id}",
            get(routes::payments::verify::<S>),
        )
        .route("/reviews", post(routes::reviews::create::<S>))
        .route("/notifications", get(routes::notifications::list::<S>))
        .route(
            "/notifications/{id}/read",
            post(routes::notifications::mark_read::<S>),
        )
        .route(
            "/notifications/broadcast",
            post(routes::notifications::broadcast::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
