use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{Money, OrderId, PaymentMethod, PaymentStatus};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Method-specific payment credentials supplied at checkout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentDetails {
    /// Methods that need no credentials (cash on delivery, bank transfer).
    #[default]
    None,
    Card {
        number: String,
        holder: String,
        expiry: String,
    },
    Wallet {
        account: String,
    },
}

/// A single charge request.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub amount: Money,
    pub details: PaymentDetails,
}

/// What the gateway decided about a charge.
///
/// Business declines (bad card, issuer refusal) are `Ok` outcomes with
/// `approved = false`; only transport-level trouble is a [`GatewayError`].
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub approved: bool,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub message: String,
}

impl PaymentOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            approved: false,
            transaction_id: None,
            status: PaymentStatus::Failed,
            message: message.into(),
        }
    }
}

/// Transport-level gateway failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Seam to the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        request: &PaymentRequest,
    ) -> std::result::Result<PaymentOutcome, GatewayError>;
}

#[derive(Default)]
struct GatewayState {
    decline_next: bool,
    unavailable_next: bool,
    delay: Option<Duration>,
}

/// Simulated gateway with per-method settlement policies.
///
/// Cash on delivery and bank transfer settle out of band, so an approved
/// charge stays `pending`. Card-like methods settle immediately and carry
/// genuine failure modes: malformed card details, injected declines and a
/// configurable response delay for exercising the processor's timeout.
#[derive(Clone, Default)]
pub struct SimulatedGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declines the next charge with an issuer-refusal outcome.
    pub async fn set_decline_next(&self) {
        self.state.write().await.decline_next = true;
    }

    /// Fails the next charge at the transport level.
    pub async fn set_unavailable_next(&self) {
        self.state.write().await.unavailable_next = true;
    }

    /// Delays every response, for timeout tests.
    pub async fn set_delay(&self, delay: Duration) {
        self.state.write().await.delay = Some(delay);
    }

    fn new_transaction_id() -> String {
        format!("TXN-{}", Uuid::new_v4().simple())
    }

    fn validate_card(number: &str) -> Option<&'static str> {
        let digits = number.chars().filter(|c| !c.is_whitespace());
        if !digits.clone().all(|c| c.is_ascii_digit()) {
            return Some("card number contains non-digits");
        }
        let len = digits.count();
        if !(12..=19).contains(&len) {
            return Some("card number has invalid length");
        }
        None
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(
        &self,
        request: &PaymentRequest,
    ) -> std::result::Result<PaymentOutcome, GatewayError> {
        let (decline, unavailable, delay) = {
            let mut state = self.state.write().await;
            let decline = std::mem::take(&mut state.decline_next);
            let unavailable = std::mem::take(&mut state.unavailable_next);
            (decline, unavailable, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if unavailable {
            return Err(GatewayError::Unavailable(
                "connection refused".to_string(),
            ));
        }
        if decline {
            return Ok(PaymentOutcome::failed("declined by issuer"));
        }

        // Deferred methods settle after delivery or out of band
        if request.method.is_deferred() {
            return Ok(PaymentOutcome {
                approved: true,
                transaction_id: Some(Self::new_transaction_id()),
                status: PaymentStatus::Pending,
                message: "awaiting settlement".to_string(),
            });
        }

        if request.method == PaymentMethod::CreditCard {
            let reason = match &request.details {
                PaymentDetails::Card { number, .. } => Self::validate_card(number),
                _ => Some("missing card details"),
            };
            if let Some(reason) = reason {
                return Ok(PaymentOutcome::failed(reason));
            }
        }

        Ok(PaymentOutcome {
            approved: true,
            transaction_id: Some(Self::new_transaction_id()),
            status: PaymentStatus::Completed,
            message: "approved".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: PaymentMethod, details: PaymentDetails) -> PaymentRequest {
        PaymentRequest {
            order_id: OrderId::new(),
            method,
            amount: Money::from_cents(3200),
            details,
        }
    }

    fn card(number: &str) -> PaymentDetails {
        PaymentDetails::Card {
            number: number.to_string(),
            holder: "A Farmer".to_string(),
            expiry: "12/27".to_string(),
        }
    }

    #[tokio::test]
    async fn bank_transfer_stays_pending() {
        let gateway = SimulatedGateway::new();
        let outcome = gateway
            .charge(&request(PaymentMethod::BankTransfer, PaymentDetails::None))
            .await
            .unwrap();

        assert!(outcome.approved);
        assert_eq!(outcome.status, PaymentStatus::Pending);
        assert!(outcome.transaction_id.is_some());
    }

    #[tokio::test]
    async fn valid_card_completes() {
        let gateway = SimulatedGateway::new();
        let outcome = gateway
            .charge(&request(PaymentMethod::CreditCard, card("4111 1111 1111 1111")))
            .await
            .unwrap();

        assert!(outcome.approved);
        assert_eq!(outcome.status, PaymentStatus::Completed);
        assert!(outcome.transaction_id.unwrap().starts_with("TXN-"));
    }

    #[tokio::test]
    async fn short_card_number_fails() {
        let gateway = SimulatedGateway::new();
        let outcome = gateway
            .charge(&request(PaymentMethod::CreditCard, card("4111")))
            .await
            .unwrap();

        assert!(!outcome.approved);
        assert_eq!(outcome.status, PaymentStatus::Failed);
        assert!(outcome.transaction_id.is_none());
    }

    #[tokio::test]
    async fn non_digit_card_number_fails() {
        let gateway = SimulatedGateway::new();
        let outcome = gateway
            .charge(&request(PaymentMethod::CreditCard, card("4111-bad-card-00")))
            .await
            .unwrap();

        assert!(!outcome.approved);
    }

    #[tokio::test]
    async fn card_without_details_fails() {
        let gateway = SimulatedGateway::new();
        let outcome = gateway
            .charge(&request(PaymentMethod::CreditCard, PaymentDetails::None))
            .await
            .unwrap();

        assert!(!outcome.approved);
        assert_eq!(outcome.message, "missing card details");
    }

    #[tokio::test]
    async fn decline_applies_once() {
        let gateway = SimulatedGateway::new();
        gateway.set_decline_next().await;

        let declined = gateway
            .charge(&request(PaymentMethod::Paypal, PaymentDetails::None))
            .await
            .unwrap();
        assert!(!declined.approved);
        assert_eq!(declined.message, "declined by issuer");

        let retried = gateway
            .charge(&request(PaymentMethod::Paypal, PaymentDetails::None))
            .await
            .unwrap();
        assert!(retried.approved);
    }

    #[tokio::test]
    async fn unavailable_is_a_transport_error() {
        let gateway = SimulatedGateway::new();
        gateway.set_unavailable_next().await;

        let err = gateway
            .charge(&request(PaymentMethod::Crypto, PaymentDetails::None))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }
}
