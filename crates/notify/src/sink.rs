use std::sync::Arc;

use common::{NotificationKind, Role, UserId};
use store::{MarketStore, NewAuditEntry, NewNotification, NotificationRecord};

use crate::mailer::Mailer;
use crate::Result;

/// Best-effort writer for the cross-cutting audit trail.
///
/// Audit writes must never fail the operation being audited, so errors are
/// logged and swallowed here.
pub struct AuditTrail<S> {
    store: Arc<S>,
}

impl<S> Clone for AuditTrail<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: MarketStore> AuditTrail<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Records one audit entry. Failures are logged, not returned.
    pub async fn record(&self, entry: NewAuditEntry) {
        let action = entry.action.clone();
        let table = entry.table_name.clone();
        if let Err(e) = self.store.insert_audit(entry).await {
            tracing::warn!(error = %e, action, table, "audit write failed, continuing");
        }
    }
}

/// Outcome of a role-filtered broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub recipients: u64,
    pub emails_sent: u64,
    pub email_failures: u64,
}

/// Writes user-facing notifications, optionally fanning out over email.
pub struct Notifier<S, M> {
    store: Arc<S>,
    mailer: Arc<M>,
}

impl<S, M> Clone for Notifier<S, M> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            mailer: self.mailer.clone(),
        }
    }
}

impl<S: MarketStore, M: Mailer> Notifier<S, M> {
    pub fn new(store: Arc<S>, mailer: Arc<M>) -> Self {
        Self { store, mailer }
    }

    /// Inserts a single notification for one user.
    pub async fn notify_user(
        &self,
        user_id: UserId,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Result<NotificationRecord> {
        let record = self
            .store
            .insert_notification(NewNotification {
                user_id,
                message: message.into(),
                kind,
            })
            .await?;
        Ok(record)
    }

    /// Inserts one notification per user holding `role`, then optionally
    /// emails each of them.
    ///
    /// The notification rows are committed before any email is attempted;
    /// per-recipient delivery failures are counted in the report and never
    /// roll anything back.
    #[tracing::instrument(skip(self, message), fields(role = %role))]
    pub async fn broadcast(
        &self,
        role: Role,
        message: &str,
        kind: NotificationKind,
        send_email: bool,
    ) -> Result<BroadcastReport> {
        let users = self.store.list_users_by_role(role).await?;

        let notifications: Vec<NewNotification> = users
            .iter()
            .map(|u| NewNotification {
                user_id: u.id,
                message: message.to_string(),
                kind,
            })
            .collect();
        let recipients = self.store.insert_notifications(notifications).await?;

        let mut emails_sent = 0;
        let mut email_failures = 0;
        if send_email {
            for user in &users {
                match self.mailer.send(&user.email, "AgriMarket", message).await {
                    Ok(()) => emails_sent += 1,
                    Err(e) => {
                        email_failures += 1;
                        tracing::warn!(error = %e, "broadcast email failed");
                    }
                }
            }
        }

        Ok(BroadcastReport {
            recipients,
            emails_sent,
            email_failures,
        })
    }
}
