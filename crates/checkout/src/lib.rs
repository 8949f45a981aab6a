//! Payment gateway adapter and checkout orchestration.
//!
//! [`PaymentGateway`] is the seam to the (simulated) payment provider;
//! [`PaymentProcessor`] wraps every charge in a timeout, logs exactly one
//! payment attempt per call, and idempotently applies the outcome to the
//! order. [`CheckoutCoordinator`] drives cart, order and payment as one
//! flow.

pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod processor;

pub use coordinator::{CheckoutCoordinator, CheckoutReceipt};
pub use error::{CheckoutError, Result};
pub use gateway::{
    GatewayError, PaymentDetails, PaymentGateway, PaymentOutcome, PaymentRequest, SimulatedGateway,
};
pub use processor::PaymentProcessor;
