use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Error returned when an email could not be delivered.
#[derive(Debug, Error)]
#[error("mail delivery to {to} failed: {reason}")]
pub struct MailerError {
    pub to: String,
    pub reason: String,
}

/// Outbound email transport.
///
/// Message formatting and the transport itself live behind this boundary;
/// callers only see whether delivery was accepted.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str)
    -> std::result::Result<(), MailerError>;
}

/// An email captured by [`InMemoryMailer`].
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
struct MailerState {
    sent: Vec<SentEmail>,
    fail_all: bool,
    failing_addresses: HashSet<String>,
}

/// In-memory mailer for testing. Records every accepted email and can be
/// told to fail all deliveries or deliveries to specific addresses.
#[derive(Clone, Default)]
pub struct InMemoryMailer {
    state: Arc<RwLock<MailerState>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent delivery fail.
    pub async fn set_fail_all(&self, fail: bool) {
        self.state.write().await.fail_all = fail;
    }

    /// Makes deliveries to one address fail.
    pub async fn fail_for(&self, address: impl Into<String>) {
        self.state
            .write()
            .await
            .failing_addresses
            .insert(address.into());
    }

    /// Number of emails accepted so far.
    pub async fn sent_count(&self) -> usize {
        self.state.read().await.sent.len()
    }

    /// All emails accepted so far.
    pub async fn sent(&self) -> Vec<SentEmail> {
        self.state.read().await.sent.clone()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), MailerError> {
        let mut state = self.state.write().await;
        if state.fail_all || state.failing_addresses.contains(to) {
            return Err(MailerError {
                to: to.to_string(),
                reason: "delivery refused".to_string(),
            });
        }
        state.sent.push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
