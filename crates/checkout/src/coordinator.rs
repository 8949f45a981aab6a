use common::{NotificationKind, PaymentMethod};
use domain::{Actor, CartService, OrderService};
use notify::{Mailer, Notifier};
use store::{MarketStore, OrderRecord};

use crate::error::Result;
use crate::gateway::{PaymentDetails, PaymentGateway, PaymentOutcome};
use crate::processor::PaymentProcessor;

/// Result of a completed checkout: the order as stored after the payment
/// attempt, plus the gateway's verdict.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: OrderRecord,
    pub payment: PaymentOutcome,
}

/// Orchestrates cart, order and payment into one checkout flow.
///
/// A declined or failed payment does not roll the order back: the order
/// stays `pending` with `payment_status = failed` so the customer can retry
/// payment without re-reserving stock.
pub struct CheckoutCoordinator<S, G, M> {
    carts: CartService<S>,
    orders: OrderService<S>,
    processor: PaymentProcessor<S, G>,
    notifier: Notifier<S, M>,
}

impl<S, G, M> Clone for CheckoutCoordinator<S, G, M> {
    fn clone(&self) -> Self {
        Self {
            carts: self.carts.clone(),
            orders: self.orders.clone(),
            processor: self.processor.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<S, G, M> CheckoutCoordinator<S, G, M>
where
    S: MarketStore,
    G: PaymentGateway,
    M: Mailer,
{
    pub fn new(
        carts: CartService<S>,
        orders: OrderService<S>,
        processor: PaymentProcessor<S, G>,
        notifier: Notifier<S, M>,
    ) -> Self {
        Self {
            carts,
            orders,
            processor,
            notifier,
        }
    }

    /// Converts the actor's cart into an order and runs the payment.
    #[tracing::instrument(skip(self, actor, shipping_address, details), fields(user_id = %actor.user_id))]
    pub async fn checkout(
        &self,
        actor: &Actor,
        shipping_address: serde_json::Value,
        payment_method: PaymentMethod,
        details: PaymentDetails,
    ) -> Result<CheckoutReceipt> {
        let cart = self.carts.get(actor.user_id).await;
        let order = self
            .orders
            .place_order(actor, &cart, shipping_address, payment_method)
            .await?;
        self.carts.clear(actor.user_id).await;

        let payment = self.processor.process(&order, details).await?;
        metrics::counter!("checkouts_total").increment(1);

        let message = if payment.approved {
            format!("Order {} placed, payment {}", order.id, payment.status)
        } else {
            format!("Order {} placed, payment failed: {}", order.id, payment.message)
        };
        if let Err(e) = self
            .notifier
            .notify_user(actor.user_id, message, NotificationKind::Order)
            .await
        {
            tracing::warn!(error = %e, order_id = %order.id, "checkout notification failed");
        }

        // Re-read to pick up payment_status and transaction_id
        let order = self.orders.get_order(actor, order.id).await?;
        Ok(CheckoutReceipt { order, payment })
    }
}
