//! Audit and notification sink.
//!
//! Everything in this crate sits off the critical path: order and payment
//! writes must succeed or fail on their own, so [`AuditTrail`] swallows its
//! errors (logging them) and [`Notifier`] tolerates partial email failure.

pub mod error;
pub mod mailer;
pub mod sink;

pub use error::{NotifyError, Result};
pub use mailer::{InMemoryMailer, Mailer, MailerError, SentEmail};
pub use sink::{AuditTrail, BroadcastReport, Notifier};
