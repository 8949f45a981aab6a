//! Integration tests for the API server over the in-memory store.

use std::sync::{Arc, OnceLock};

use api::state::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Money, Role, SubscriptionTier, UserId, VendorId};
use domain::PricingPolicy;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryMarketStore, MarketStore, NewProduct, NewUser, NewVendor, ProductRecord};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (Router, Arc<AppState<InMemoryMarketStore>>) {
    let state = api::create_default_state(PricingPolicy::default());
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn seed_user(store: &InMemoryMarketStore, role: Role) -> UserId {
    store
        .insert_user(NewUser {
            email: format!("{}-{}@example.com", role, uuid::Uuid::new_v4()),
            name: "Test User".to_string(),
            role,
        })
        .await
        .unwrap()
        .id
}

async fn seed_vendor(store: &InMemoryMarketStore) -> (UserId, VendorId) {
    let user_id = seed_user(store, Role::Vendor).await;
    let vendor = store
        .insert_vendor(NewVendor {
            user_id,
            business_name: "Green Acres".to_string(),
            tier: SubscriptionTier::Basic,
        })
        .await
        .unwrap();
    (user_id, vendor.id)
}

async fn seed_product(
    store: &InMemoryMarketStore,
    name: &str,
    price: Money,
    stock: u32,
) -> ProductRecord {
    let (_, vendor_id) = seed_vendor(store).await;
    store
        .insert_product(NewProduct {
            vendor_id,
            category_id: None,
            name: name.to_string(),
            description: String::new(),
            price,
            stock,
            image_url: None,
            featured: false,
        })
        .await
        .unwrap()
}

fn get(uri: &str, user: UserId, role: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", user.to_string())
        .header("x-role", role)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, user: UserId, role: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-user-id", user.to_string())
        .header("x-role", role)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Puts `quantity` of a product into the user's cart through the API.
async fn add_to_cart(app: &Router, user: UserId, product: &ProductRecord, quantity: u32) {
    let response = app
        .clone()
        .oneshot(post_json(
            "/cart/items",
            user,
            "customer",
            &serde_json::json!({ "product_id": product.id, "quantity": quantity }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

/// Checks out the user's cart with a bank transfer and returns the response
/// body.
async fn checkout_bank_transfer(app: &Router, user: UserId) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(post_json(
            "/checkout",
            user,
            "customer",
            &serde_json::json!({
                "shipping_address": { "line1": "12 Main St", "city": "Springfield" },
                "payment_method": "bank_transfer",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let (app, _) = setup();

    let response = app
        .oneshot(Request::builder().uri("/cart").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_product_id_format() {
    let (app, state) = setup();
    let user = seed_user(&state.store, Role::Customer).await;

    let response = app
        .oneshot(get("/products/not-a-uuid", user, "customer"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vendor_creates_and_lists_product() {
    let (app, state) = setup();
    let (user, vendor_id) = seed_vendor(&state.store).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/products")
                .header("x-user-id", user.to_string())
                .header("x-role", "vendor")
                .header("x-vendor-id", vendor_id.to_string())
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&serde_json::json!({
                        "name": "Tomato seeds",
                        "price_cents": 500,
                        "stock": 10,
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["name"], "Tomato seeds");
    assert_eq!(created["price_cents"], 500);

    let response = app
        .oneshot(get("/products?search=tomato", user, "vendor"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let products = body_json(response).await;
    assert_eq!(products.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_customer_cannot_create_product() {
    let (app, state) = setup();
    let user = seed_user(&state.store, Role::Customer).await;

    let response = app
        .oneshot(post_json(
            "/products",
            user,
            "customer",
            &serde_json::json!({ "name": "Nope", "price_cents": 100, "stock": 1 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cart_add_and_get() {
    let (app, state) = setup();
    let user = seed_user(&state.store, Role::Customer).await;
    let product = seed_product(&state.store, "Carrots", Money::from_cents(250), 10).await;

    add_to_cart(&app, user, &product, 3).await;

    let response = app.oneshot(get("/cart", user, "customer")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cart = body_json(response).await;
    assert_eq!(cart["item_count"], 3);
    assert_eq!(cart["subtotal_cents"], 750);
    assert_eq!(cart["lines"][0]["product_name"], "Carrots");
}

#[tokio::test]
async fn test_cart_add_beyond_stock_conflicts() {
    let (app, state) = setup();
    let user = seed_user(&state.store, Role::Customer).await;
    let product = seed_product(&state.store, "Carrots", Money::from_cents(250), 2).await;

    let response = app
        .oneshot(post_json(
            "/cart/items",
            user,
            "customer",
            &serde_json::json!({ "product_id": product.id, "quantity": 5 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_checkout_happy_path() {
    let (app, state) = setup();
    let user = seed_user(&state.store, Role::Customer).await;
    let seeds = seed_product(&state.store, "Seeds", Money::from_dollars(5), 10).await;
    let trowel = seed_product(&state.store, "Trowel", Money::from_dollars(10), 10).await;

    add_to_cart(&app, user, &seeds, 2).await;
    add_to_cart(&app, user, &trowel, 1).await;

    let receipt = checkout_bank_transfer(&app, user).await;
    // (2 x $5 + $10) * 1.10 + $10 shipping = $32.00
    assert_eq!(receipt["order"]["total_cents"], 3200);
    assert_eq!(receipt["order"]["status"], "pending");
    assert_eq!(receipt["order"]["payment_status"], "pending");
    assert_eq!(receipt["payment"]["approved"], true);

    // Cart is cleared and the order is listed
    let cart = body_json(app.clone().oneshot(get("/cart", user, "customer")).await.unwrap()).await;
    assert_eq!(cart["item_count"], 0);

    let orders = body_json(app.oneshot(get("/orders", user, "customer")).await.unwrap()).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_checkout_empty_cart_is_rejected() {
    let (app, state) = setup();
    let user = seed_user(&state.store, Role::Customer).await;

    let response = app
        .oneshot(post_json(
            "/checkout",
            user,
            "customer",
            &serde_json::json!({
                "shipping_address": { "line1": "12 Main St" },
                "payment_method": "credit_card",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_with_declined_card_keeps_order() {
    let (app, state) = setup();
    let user = seed_user(&state.store, Role::Customer).await;
    let product = seed_product(&state.store, "Seeds", Money::from_dollars(5), 10).await;

    add_to_cart(&app, user, &product, 1).await;
    state.gateway.set_decline_next().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/checkout",
            user,
            "customer",
            &serde_json::json!({
                "shipping_address": { "line1": "12 Main St" },
                "payment_method": "credit_card",
                "payment_details": {
                    "type": "card",
                    "number": "4111111111111111",
                    "holder": "A Farmer",
                    "expiry": "12/27",
                },
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = body_json(response).await;
    assert_eq!(receipt["payment"]["approved"], false);
    assert_eq!(receipt["order"]["payment_status"], "failed");
    assert_eq!(receipt["order"]["status"], "pending");
}

#[tokio::test]
async fn test_order_status_transitions() {
    let (app, state) = setup();
    let customer = seed_user(&state.store, Role::Customer).await;
    let staff = seed_user(&state.store, Role::Staff).await;
    let product = seed_product(&state.store, "Seeds", Money::from_dollars(5), 10).await;

    add_to_cart(&app, customer, &product, 1).await;
    let receipt = checkout_bank_transfer(&app, customer).await;
    let order_id = receipt["order"]["id"].as_str().unwrap().to_string();

    // Skipping straight to delivered is rejected
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/orders/{order_id}/status"),
            staff,
            "staff",
            &serde_json::json!({ "status": "delivered" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // pending -> processing works and lands in the history
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/orders/{order_id}/status"),
            staff,
            "staff",
            &serde_json::json!({ "status": "processing" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["status"], "processing");

    let history = body_json(
        app.oneshot(get(&format!("/orders/{order_id}/history"), customer, "customer"))
            .await
            .unwrap(),
    )
    .await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["status"], "pending");
    assert_eq!(history[1]["status"], "processing");
}

#[tokio::test]
async fn test_customer_cannot_set_status_but_can_cancel() {
    let (app, state) = setup();
    let customer = seed_user(&state.store, Role::Customer).await;
    let product = seed_product(&state.store, "Seeds", Money::from_dollars(5), 10).await;

    add_to_cart(&app, customer, &product, 1).await;
    let receipt = checkout_bank_transfer(&app, customer).await;
    let order_id = receipt["order"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/orders/{order_id}/status"),
            customer,
            "customer",
            &serde_json::json!({ "status": "shipped" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(post_json(
            &format!("/orders/{order_id}/cancel"),
            customer,
            "customer",
            &serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["status"], "cancelled");
}

#[tokio::test]
async fn test_other_customers_order_is_hidden() {
    let (app, state) = setup();
    let owner = seed_user(&state.store, Role::Customer).await;
    let stranger = seed_user(&state.store, Role::Customer).await;
    let product = seed_product(&state.store, "Seeds", Money::from_dollars(5), 10).await;

    add_to_cart(&app, owner, &product, 1).await;
    let receipt = checkout_bank_transfer(&app, owner).await;
    let order_id = receipt["order"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get(&format!("/orders/{order_id}"), stranger, "customer"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // And their listing stays empty
    let orders = body_json(
        app.oneshot(get("/orders", stranger, "customer")).await.unwrap(),
    )
    .await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_payment_verification_by_transaction() {
    let (app, state) = setup();
    let customer = seed_user(&state.store, Role::Customer).await;
    let stranger = seed_user(&state.store, Role::Customer).await;
    let product = seed_product(&state.store, "Seeds", Money::from_dollars(5), 10).await;

    add_to_cart(&app, customer, &product, 1).await;
    let receipt = checkout_bank_transfer(&app, customer).await;
    let txn = receipt["order"]["transaction_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get(&format!("/payments/{txn}"), customer, "customer"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["transaction_id"], txn.as_str());

    let response = app
        .oneshot(get(&format!("/payments/{txn}"), stranger, "customer"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_settles_deferred_payment() {
    let (app, state) = setup();
    let customer = seed_user(&state.store, Role::Customer).await;
    let staff = seed_user(&state.store, Role::Staff).await;
    let product = seed_product(&state.store, "Seeds", Money::from_dollars(5), 10).await;

    add_to_cart(&app, customer, &product, 1).await;
    let receipt = checkout_bank_transfer(&app, customer).await;
    let order_id = receipt["order"]["id"].as_str().unwrap().to_string();

    // Customers may not settle
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/orders/{order_id}/payment-status"),
            customer,
            "customer",
            &serde_json::json!({ "status": "completed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(post_json(
            &format!("/orders/{order_id}/payment-status"),
            staff,
            "staff",
            &serde_json::json!({ "status": "completed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["payment_status"], "completed");
}

#[tokio::test]
async fn test_review_lifecycle() {
    let (app, state) = setup();
    let customer = seed_user(&state.store, Role::Customer).await;
    let staff = seed_user(&state.store, Role::Staff).await;
    let product = seed_product(&state.store, "Seeds", Money::from_dollars(5), 10).await;

    add_to_cart(&app, customer, &product, 1).await;
    let receipt = checkout_bank_transfer(&app, customer).await;
    let order_id = receipt["order"]["id"].as_str().unwrap().to_string();

    let review_body = serde_json::json!({
        "order_id": order_id,
        "product_id": product.id,
        "rating": 5,
        "comment": "Sprouted in a week",
    });

    // Not delivered yet
    let response = app
        .clone()
        .oneshot(post_json("/reviews", customer, "customer", &review_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for status in ["processing", "shipped", "delivered"] {
        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/orders/{order_id}/status"),
                staff,
                "staff",
                &serde_json::json!({ "status": status }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_json("/reviews", customer, "customer", &review_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // One review per (user, product, order)
    let response = app
        .clone()
        .oneshot(post_json("/reviews", customer, "customer", &review_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let reviews = body_json(
        app.oneshot(get(
            &format!("/products/{}/reviews", product.id),
            customer,
            "customer",
        ))
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(reviews.as_array().unwrap().len(), 1);
    assert_eq!(reviews[0]["rating"], 5);
}

#[tokio::test]
async fn test_notifications_inbox_and_mark_read() {
    let (app, state) = setup();
    let customer = seed_user(&state.store, Role::Customer).await;
    let other = seed_user(&state.store, Role::Customer).await;
    let staff = seed_user(&state.store, Role::Staff).await;
    let product = seed_product(&state.store, "Seeds", Money::from_dollars(5), 10).await;

    add_to_cart(&app, customer, &product, 1).await;
    let receipt = checkout_bank_transfer(&app, customer).await;
    let order_id = receipt["order"]["id"].as_str().unwrap().to_string();

    // A status change appends an order notification
    app.clone()
        .oneshot(post_json(
            &format!("/orders/{order_id}/status"),
            staff,
            "staff",
            &serde_json::json!({ "status": "processing" }),
        ))
        .await
        .unwrap();

    let inbox = body_json(
        app.clone()
            .oneshot(get("/notifications", customer, "customer"))
            .await
            .unwrap(),
    )
    .await;
    let inbox = inbox.as_array().unwrap();
    assert!(!inbox.is_empty());
    let first_id = inbox[0]["id"].as_str().unwrap().to_string();

    // A stranger cannot mark it read
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/notifications/{first_id}/read"),
            other,
            "customer",
            &serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(post_json(
            &format!("/notifications/{first_id}/read"),
            customer,
            "customer",
            &serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_broadcast_is_admin_only() {
    let (app, state) = setup();
    let admin = seed_user(&state.store, Role::Admin).await;
    let customer = seed_user(&state.store, Role::Customer).await;
    seed_user(&state.store, Role::Customer).await;

    let body = serde_json::json!({
        "role": "customer",
        "message": "Harvest sale this weekend",
        "kind": "promotion",
        "send_email": true,
    });

    let response = app
        .clone()
        .oneshot(post_json("/notifications/broadcast", customer, "customer", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(post_json("/notifications/broadcast", admin, "admin", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["recipients"], 2);
    assert_eq!(report["emails_sent"], 2);
    assert_eq!(report["email_failures"], 0);
}
