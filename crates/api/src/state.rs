//! Shared application state wiring the services together.

use std::sync::Arc;

use checkout::{CheckoutCoordinator, PaymentProcessor, SimulatedGateway};
use domain::{CartService, CatalogService, OrderService, PricingPolicy, ReviewService};
use notify::{InMemoryMailer, Notifier};
use store::{InMemoryMarketStore, MarketStore};

/// Shared application state accessible from all handlers.
///
/// The gateway and mailer are the simulated/in-memory implementations in
/// every configuration; only the store varies between deployments.
pub struct AppState<S: MarketStore> {
    pub store: Arc<S>,
    pub gateway: Arc<SimulatedGateway>,
    pub mailer: Arc<InMemoryMailer>,
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub reviews: ReviewService<S>,
    pub processor: PaymentProcessor<S, SimulatedGateway>,
    pub coordinator: CheckoutCoordinator<S, SimulatedGateway, InMemoryMailer>,
    pub notifier: Notifier<S, InMemoryMailer>,
}

/// Builds the application state around an existing store.
pub fn create_state<S: MarketStore>(store: Arc<S>, pricing: PricingPolicy) -> Arc<AppState<S>> {
    let gateway = Arc::new(SimulatedGateway::new());
    let mailer = Arc::new(InMemoryMailer::new());

    let catalog = CatalogService::new(store.clone());
    let carts = CartService::new(store.clone());
    let orders = OrderService::new(store.clone(), pricing);
    let reviews = ReviewService::new(store.clone());
    let processor = PaymentProcessor::new(store.clone(), gateway.clone());
    let notifier = Notifier::new(store.clone(), mailer.clone());
    let coordinator = CheckoutCoordinator::new(
        carts.clone(),
        orders.clone(),
        processor.clone(),
        notifier.clone(),
    );

    Arc::new(AppState {
        store,
        gateway,
        mailer,
        catalog,
        carts,
        orders,
        reviews,
        processor,
        coordinator,
        notifier,
    })
}

/// Builds the default state over the in-memory store. Used by the server
/// when `DATABASE_URL` is unset, and by tests.
pub fn create_default_state(pricing: PricingPolicy) -> Arc<AppState<InMemoryMarketStore>> {
    create_state(Arc::new(InMemoryMarketStore::new()), pricing)
}
