//! Admin inbox messages derived from domain events.
//!
//! Each event kind has a [`MessageFormatter`] registered by name. Formatting
//! never fails the triggering action: an empty text means "no message".

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::comments::strip_markup;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Comment, Message};
use crate::pager::Pager;

pub const COMMENT: &str = "comment";
pub const BACKUP: &str = "backup";

/// Unread messages are always listed ten at a time.
pub const UNREAD_PAGE_SIZE: i64 = 10;

/// Outcome of a site backup run.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupOutcome {
    pub succeeded: bool,
    /// Archive location on success, failure reason otherwise.
    pub detail: String,
}

/// Data carried by an event.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Comment(Comment),
    Backup(BackupOutcome),
    /// Payload for formatters registered at runtime.
    Custom(serde_json::Value),
}

/// Turns an event payload into message text; empty text suppresses the message.
#[async_trait]
pub trait MessageFormatter: Send + Sync {
    async fn format(&self, repo: &Repository, payload: &EventPayload) -> String;
}

/// Formats new comments and replies.
pub struct CommentFormatter;

#[async_trait]
impl MessageFormatter for CommentFormatter {
    async fn format(&self, repo: &Repository, payload: &EventPayload) -> String {
        let EventPayload::Comment(comment) = payload else {
            return String::new();
        };

        let author = ammonia::clean_text(&comment.author);
        let text = strip_markup(&comment.content);

        let title = match repo.get_post(comment.post_id).await {
            Ok(Some(post)) => post.title,
            Ok(None) => {
                tracing::warn!("Post {} of comment {} not found", comment.post_id, comment.id);
                return format!("<p>{} commented: </p><p>{}</p>", author, text);
            }
            Err(e) => {
                tracing::warn!("Post lookup for comment {} failed: {}", comment.id, e);
                return format!("<p>{} commented: </p><p>{}</p>", author, text);
            }
        };

        if !comment.is_reply() {
            return format!(
                "<p>{} commented on post <i>{}</i>: </p><p>{}</p>",
                author, title, text
            );
        }

        match repo.get_comment(comment.parent_id).await {
            Ok(Some(parent)) => format!(
                "<p>{} replied {}'s comment on <i>{}</i>: </p><p>{}</p>",
                author,
                ammonia::clean_text(&parent.author),
                title,
                text
            ),
            _ => format!("<p>{} commented on post <i>{}</i>: </p>", author, title),
        }
    }
}

/// Formats backup outcomes.
pub struct BackupFormatter;

#[async_trait]
impl MessageFormatter for BackupFormatter {
    async fn format(&self, _repo: &Repository, payload: &EventPayload) -> String {
        match payload {
            EventPayload::Backup(outcome) if outcome.succeeded => {
                format!("The site is successfully backed up at: {}", outcome.detail)
            }
            EventPayload::Backup(outcome) => {
                format!("Failed to back up the site: {}.", outcome.detail)
            }
            _ => String::new(),
        }
    }
}

/// Event kind to formatter table, open to registration at runtime.
pub struct FormatterRegistry {
    formatters: RwLock<HashMap<String, Arc<dyn MessageFormatter>>>,
}

impl FormatterRegistry {
    /// Register `formatter` for `kind`, replacing any previous one.
    pub async fn register(&self, kind: &str, formatter: Arc<dyn MessageFormatter>) {
        self.formatters
            .write()
            .await
            .insert(kind.to_string(), formatter);
    }

    async fn get(&self, kind: &str) -> Option<Arc<dyn MessageFormatter>> {
        self.formatters.read().await.get(kind).cloned()
    }
}

impl Default for FormatterRegistry {
    /// Comment and backup formatters pre-registered.
    fn default() -> Self {
        let mut formatters: HashMap<String, Arc<dyn MessageFormatter>> = HashMap::new();
        formatters.insert(COMMENT.to_string(), Arc::new(CommentFormatter));
        formatters.insert(BACKUP.to_string(), Arc::new(BackupFormatter));
        Self {
            formatters: RwLock::new(formatters),
        }
    }
}

/// Creates inbox messages from events.
pub struct MessageGenerator {
    repo: Arc<Repository>,
    registry: Arc<FormatterRegistry>,
}

impl MessageGenerator {
    pub fn new(repo: Arc<Repository>, registry: Arc<FormatterRegistry>) -> Self {
        Self { repo, registry }
    }

    /// Message text for an event, or `None` when nothing should be stored.
    pub async fn generate(&self, kind: &str, payload: &EventPayload) -> Option<String> {
        let Some(formatter) = self.registry.get(kind).await else {
            tracing::warn!("No message formatter registered for {:?}", kind);
            return None;
        };

        let text = formatter.format(&self.repo, payload).await;
        if text.is_empty() {
            tracing::warn!("Message formatter for {:?} returned empty text", kind);
            return None;
        }
        Some(text)
    }

    /// Generate and store a message. `Ok(None)` when generation was suppressed.
    pub async fn create_from_event(
        &self,
        kind: &str,
        payload: &EventPayload,
    ) -> Result<Option<Message>, AppError> {
        match self.generate(kind, payload).await {
            Some(text) => Ok(Some(self.repo.insert_message(kind, &text).await?)),
            None => Ok(None),
        }
    }

    /// Like `create_from_event`, for callers that must not fail on notification.
    pub async fn notify(&self, kind: &str, payload: EventPayload) {
        if let Err(e) = self.create_from_event(kind, &payload).await {
            tracing::error!("Failed to store {} message: {}", kind, e);
        }
    }

    /// One page of unread messages, newest first.
    pub async fn list_unread(&self, page: i64) -> Result<(Vec<Message>, Pager), AppError> {
        self.repo.list_unread_messages(page, UNREAD_PAGE_SIZE).await
    }
}
