//! Admin inbox endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{success, ApiResult, Page, PageQuery};
use crate::errors::AppError;
use crate::messages::{BackupOutcome, EventPayload, BACKUP};
use crate::models::Message;
use crate::AppState;

/// GET /api/admin/messages - Unread messages, newest first.
pub async fn list_unread_messages(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<Message>> {
    let listing = state.messages.list_unread(query.page).await?;
    success(Page::checked(listing)?)
}

/// PUT /api/admin/messages/:id/read
pub async fn mark_message_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    state.repo.mark_message_read(id).await?;
    success(())
}

/// POST /api/admin/messages/backup - Record the outcome of a backup run.
pub async fn record_backup(
    State(state): State<AppState>,
    Json(outcome): Json<BackupOutcome>,
) -> ApiResult<Message> {
    match state
        .messages
        .create_from_event(BACKUP, &EventPayload::Backup(outcome))
        .await?
    {
        Some(message) => success(message),
        None => Err(AppError::Internal(
            "Backup message could not be generated".to_string(),
        )),
    }
}
