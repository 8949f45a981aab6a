//! Shared vocabulary for the marketplace: typed identifiers, money and the
//! status enums with their transition rules.

pub mod money;
pub mod status;
pub mod types;

pub use money::Money;
pub use status::{
    NotificationKind, OrderStatus, PaymentMethod, PaymentStatus, StatusParseError,
    SubscriptionTier,
};
pub use types::{OrderId, ProductId, Role, UserId, VendorId};
