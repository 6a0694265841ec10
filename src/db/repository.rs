//! Database repository shared state and row conversion.
//!
//! Operations live next to their aggregate: `posts.rs`, `tags.rs`,
//! `comments.rs`, `messages.rs`. Multi-step writes run in one transaction.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::models::{Comment, Message, Post, Tag};
use crate::services::Services;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
    pub(super) services: Services,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_services(pool, Services::default())
    }

    pub fn with_services(pool: SqlitePool, services: Services) -> Self {
        Self { pool, services }
    }

    pub(super) fn now(&self) -> DateTime<Utc> {
        self.services.clock.now()
    }
}

// Helper functions for row conversion

pub(super) const POST_COLUMNS: &str = "id, uuid, title, slug, markdown, html, is_published, \
     is_page, allow_comment, comment_count, created_at, created_by, updated_at, updated_by, \
     published_at, published_by";

pub(super) const TAG_COLUMNS: &str =
    "id, name, slug, hidden, created_at, created_by, updated_at, updated_by";

pub(super) const COMMENT_COLUMNS: &str = "id, post_id, parent_id, author, email, avatar, \
     website, ip, user_agent, user_id, content, approved, created_at";

pub(super) const MESSAGE_COLUMNS: &str = "id, kind, text, is_read, created_at";

/// Tags are loaded separately; the returned post has none attached.
pub(super) fn post_from_row(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        uuid: row.get("uuid"),
        title: row.get("title"),
        slug: row.get("slug"),
        markdown: row.get("markdown"),
        html: row.get("html"),
        is_published: row.get("is_published"),
        is_page: row.get("is_page"),
        allow_comment: row.get("allow_comment"),
        comment_count: row.get("comment_count"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
        published_at: row.get("published_at"),
        published_by: row.get("published_by"),
        tags: Vec::new(),
    }
}

pub(super) fn tag_from_row(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        hidden: row.get("hidden"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
    }
}

pub(super) fn comment_from_row(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        parent_id: row.get("parent_id"),
        author: row.get("author"),
        email: row.get("email"),
        avatar: row.get("avatar"),
        website: row.get("website"),
        ip: row.get("ip"),
        user_agent: row.get("user_agent"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        approved: row.get("approved"),
        created_at: row.get("created_at"),
        children: Vec::new(),
    }
}

pub(super) fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Message {
    Message {
        id: row.get("id"),
        kind: row.get("kind"),
        text: row.get("text"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}
