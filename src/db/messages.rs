//! Admin notification messages.

use sqlx::Row;

use super::repository::{message_from_row, Repository, MESSAGE_COLUMNS};
use crate::errors::AppError;
use crate::models::Message;
use crate::pager::Pager;

impl Repository {
    /// Store an unread message.
    pub async fn insert_message(&self, kind: &str, text: &str) -> Result<Message, AppError> {
        let now = self.now();
        let result = sqlx::query(
            "INSERT INTO messages (kind, text, is_read, created_at) VALUES (?, ?, 0, ?)",
        )
        .bind(kind)
        .bind(text)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Message {
            id: result.last_insert_rowid(),
            kind: kind.to_string(),
            text: text.to_string(),
            is_read: false,
            created_at: now,
        })
    }

    /// One page of unread messages, newest first.
    pub async fn list_unread_messages(
        &self,
        page: i64,
        size: i64,
    ) -> Result<(Vec<Message>, Pager), AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM messages WHERE is_read = 0")
            .fetch_one(&self.pool)
            .await?;
        let pager = Pager::compute(page, size, row.get("total"));

        if !pager.is_valid {
            return Ok((Vec::new(), pager));
        }

        let rows = sqlx::query(&format!(
            "SELECT {} FROM messages WHERE is_read = 0 ORDER BY created_at DESC, id DESC \
             LIMIT ? OFFSET ?",
            MESSAGE_COLUMNS
        ))
        .bind(pager.limit())
        .bind(pager.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.iter().map(message_from_row).collect(), pager))
    }

    pub async fn mark_message_read(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE messages SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Message {} not found", id)));
        }
        Ok(())
    }
}
