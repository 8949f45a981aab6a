//! Order and payment status enums with their legal transition graphs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a stored status string is not recognized.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} value: {value}")]
pub struct StatusParseError {
    kind: &'static str,
    value: String,
}

impl StatusParseError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Fulfillment status of an order.
///
/// Legal transitions:
/// ```text
/// pending ──► processing ──► shipped ──► delivered
///    │             │            │
///    └─────────────┴────────────┴──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if `next` is a legal successor of this status.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (*self, next) {
            (Pending, Processing) | (Processing, Shipped) | (Shipped, Delivered) => true,
            (Pending | Processing | Shipped, Cancelled) => true,
            _ => false,
        }
    }

    /// Returns true for states with no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns true if a customer may still cancel in this state.
    ///
    /// Customers lose the right to cancel once the order ships; staff can
    /// still cancel up to delivery.
    pub fn customer_can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a status from its stored name.
    pub fn parse(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(StatusParseError::new("order status", other)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settlement status of an order's payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Returns true if `next` is a legal successor. Re-applying the current
    /// status is allowed so that payment updates stay idempotent.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        match (*self, next) {
            (a, b) if a == b => true,
            (Pending, Processing | Completed | Failed) => true,
            (Processing, Completed | Failed) => true,
            (Failed, Processing | Completed) => true, // retried attempt
            (Completed, Refunded) => true,
            _ => false,
        }
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Parses a status from its stored name.
    pub fn parse(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "processing" => Ok(PaymentStatus::Processing),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(StatusParseError::new("payment status", other)),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    BankTransfer,
    CreditCard,
    Paypal,
    MobilePayment,
    Crypto,
}

impl PaymentMethod {
    /// Returns true for methods that settle after delivery or out of band.
    /// Deferred methods leave the payment in `pending` at checkout.
    pub fn is_deferred(&self) -> bool {
        matches!(
            self,
            PaymentMethod::CashOnDelivery | PaymentMethod::BankTransfer
        )
    }

    /// Returns the method name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::MobilePayment => "mobile_payment",
            PaymentMethod::Crypto => "crypto",
        }
    }

    /// Parses a method from its stored name.
    pub fn parse(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "paypal" => Ok(PaymentMethod::Paypal),
            "mobile_payment" => Ok(PaymentMethod::MobilePayment),
            "crypto" => Ok(PaymentMethod::Crypto),
            other => Err(StatusParseError::new("payment method", other)),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Vendor subscription tier, which caps the number of active products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Basic,
    Premium,
    Enterprise,
}

impl SubscriptionTier {
    /// Maximum number of active products, or None for unlimited.
    pub fn product_limit(&self) -> Option<u64> {
        match self {
            SubscriptionTier::Basic => Some(10),
            SubscriptionTier::Premium => Some(50),
            SubscriptionTier::Enterprise => None,
        }
    }

    /// Returns the tier name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Basic => "basic",
            SubscriptionTier::Premium => "premium",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }

    /// Parses a tier from its stored name.
    pub fn parse(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "basic" => Ok(SubscriptionTier::Basic),
            "premium" => Ok(SubscriptionTier::Premium),
            "enterprise" => Ok(SubscriptionTier::Enterprise),
            other => Err(StatusParseError::new("subscription tier", other)),
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Order,
    Stock,
    Promotion,
}

impl NotificationKind {
    /// Returns the kind name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Order => "order",
            NotificationKind::Stock => "stock",
            NotificationKind::Promotion => "promotion",
        }
    }

    /// Parses a kind from its stored name.
    pub fn parse(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "order" => Ok(NotificationKind::Order),
            "stock" => Ok(NotificationKind::Stock),
            "promotion" => Ok(NotificationKind::Promotion),
            other => Err(StatusParseError::new("notification kind", other)),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
