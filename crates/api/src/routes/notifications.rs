//! Notification endpoints: per-user inbox and role-filtered broadcasts.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{NotificationKind, Role, UserId};
use serde::{Deserialize, Serialize};
use store::{MarketStore, NotificationRecord};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::AuthActor;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct BroadcastRequest {
    pub role: Role,
    pub message: String,
    pub kind: NotificationKind,
    #[serde(default)]
    pub send_email: bool,
}

// -- Response types --

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub user_id: UserId,
    pub message: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRecord> for NotificationResponse {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            message: record.message,
            kind: record.kind,
            read: record.read,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct BroadcastResponse {
    pub recipients: u64,
    pub emails_sent: u64,
    pub email_failures: u64,
}

// -- Handlers --

/// GET /notifications — the caller's notifications, newest first.
pub async fn list<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state.store.notifications_for_user(actor.0.user_id).await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

/// POST /notifications/{id}/read — mark one of the caller's notifications
/// as read.
pub async fn mark_read<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    // The store has no ownership column lookup by id, so scope the id to
    // the caller's inbox first.
    let owned = state
        .store
        .notifications_for_user(actor.0.user_id)
        .await?
        .iter()
        .any(|n| n.id == id);
    if !owned {
        return Err(ApiError::NotFound(format!("notification not found: {id}")));
    }
    state.store.mark_notification_read(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /notifications/broadcast — admin-only fan-out to every user holding
/// a role, optionally over email as well.
#[tracing::instrument(skip(state, actor, req), fields(user_id = %actor.0.user_id))]
pub async fn broadcast<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    actor: AuthActor,
    Json(req): Json<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    if actor.0.role != Role::Admin {
        return Err(ApiError::Domain(domain::DomainError::PermissionDenied(
            "only admins may broadcast".to_string(),
        )));
    }
    let report = state
        .notifier
        .broadcast(req.role, &req.message, req.kind, req.send_email)
        .await?;
    Ok(Json(BroadcastResponse {
        recipients: report.recipients,
        emails_sent: report.emails_sent,
        email_failures: report.email_failures,
    }))
}
