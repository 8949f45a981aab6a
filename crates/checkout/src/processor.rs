use std::sync::Arc;
use std::time::Duration;

use common::{OrderId, PaymentStatus};
use domain::DomainError;
use store::{MarketStore, NewPaymentLog, OrderRecord, PaymentUpdate};

use crate::error::Result;
use crate::gateway::{PaymentDetails, PaymentGateway, PaymentOutcome, PaymentRequest};

const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(5);

/// Drives a single payment attempt against the gateway.
///
/// Invariants: every call to [`PaymentProcessor::process`] appends exactly
/// one `payment_logs` row, success or failure, before the order itself is
/// touched; the order update is idempotent. Gateway timeouts and transport
/// errors become `failed` outcomes rather than propagating, so the attempt
/// is still logged.
pub struct PaymentProcessor<S, G> {
    store: Arc<S>,
    gateway: Arc<G>,
    timeout: Duration,
}

impl<S, G> Clone for PaymentProcessor<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            timeout: self.timeout,
        }
    }
}

impl<S: MarketStore, G: PaymentGateway> PaymentProcessor<S, G> {
    pub fn new(store: Arc<S>, gateway: Arc<G>) -> Self {
        Self {
            store,
            gateway,
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Overrides the gateway timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Charges the order's total through the gateway and applies the
    /// outcome to the order.
    #[tracing::instrument(skip(self, order, details), fields(order_id = %order.id))]
    pub async fn process(
        &self,
        order: &OrderRecord,
        details: PaymentDetails,
    ) -> Result<PaymentOutcome> {
        let method = order.payment_method.ok_or_else(|| {
            DomainError::Validation("order has no payment method".to_string())
        })?;

        let request = PaymentRequest {
            order_id: order.id,
            method,
            amount: order.total,
            details,
        };
        let outcome = match tokio::time::timeout(self.timeout, self.gateway.charge(&request)).await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, order_id = %order.id, "gateway transport failure");
                PaymentOutcome::failed(e.to_string())
            }
            Err(_) => {
                tracing::warn!(order_id = %order.id, "gateway timed out");
                PaymentOutcome::failed("payment gateway timed out")
            }
        };
        metrics::counter!("payment_attempts_total", "status" => outcome.status.as_str())
            .increment(1);

        // Log the attempt first so a crash between the two writes loses the
        // order update, not the attempt record.
        self.store
            .insert_payment_log(NewPaymentLog {
                order_id: order.id,
                method,
                amount: order.total,
                transaction_id: outcome.transaction_id.clone(),
                status: outcome.status,
                response: serde_json::json!({
                    "approved": outcome.approved,
                    "message": outcome.message,
                }),
            })
            .await?;
        self.store
            .upsert_payment(
                order.id,
                PaymentUpdate {
                    status: outcome.status,
                    transaction_id: outcome.transaction_id.clone(),
                    method: Some(method),
                },
            )
            .await?;

        Ok(outcome)
    }

    /// Looks up the order carrying a transaction id.
    pub async fn verify_status(&self, transaction_id: &str) -> Result<OrderRecord> {
        let order = self
            .store
            .find_order_by_transaction(transaction_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "transaction",
                id: transaction_id.to_string(),
            })?;
        Ok(order)
    }

    /// Manually moves an order's payment status (settlement confirmations,
    /// refunds). Validated against the payment transition graph.
    pub async fn update_payment_status(
        &self,
        order_id: OrderId,
        next: PaymentStatus,
    ) -> Result<OrderRecord> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "order",
                id: order_id.to_string(),
            })?;
        if !order.payment_status.can_transition_to(next) {
            return Err(DomainError::Validation(format!(
                "illegal payment status transition: {} -> {}",
                order.payment_status, next
            ))
            .into());
        }

        let updated = self
            .store
            .upsert_payment(
                order_id,
                PaymentUpdate {
                    status: next,
                    transaction_id: None,
                    method: None,
                },
            )
            .await?;
        Ok(updated)
    }
}
