//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for posts, tags, comments and messages.
//! Referential integrity beyond plain foreign keys is kept by the engine.

mod comments;
mod messages;
mod posts;
mod repository;
mod tags;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL,
            title TEXT NOT NULL,
            slug TEXT NOT NULL,
            markdown TEXT NOT NULL DEFAULT '',
            html TEXT NOT NULL DEFAULT '',
            is_published INTEGER NOT NULL DEFAULT 0,
            is_page INTEGER NOT NULL DEFAULT 0,
            allow_comment INTEGER NOT NULL DEFAULT 1,
            comment_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            created_by INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            updated_by INTEGER NOT NULL,
            published_at TEXT,
            published_by INTEGER
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            hidden INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            created_by INTEGER NOT NULL,
            updated_at TEXT,
            updated_by INTEGER
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts_tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL REFERENCES posts(id),
            tag_id INTEGER NOT NULL REFERENCES tags(id),
            UNIQUE (post_id, tag_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL REFERENCES posts(id),
            parent_id INTEGER NOT NULL DEFAULT 0,
            author TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            avatar TEXT NOT NULL DEFAULT '',
            website TEXT NOT NULL DEFAULT '',
            ip TEXT NOT NULL DEFAULT '',
            user_agent TEXT NOT NULL DEFAULT '',
            user_id INTEGER NOT NULL DEFAULT 0,
            content TEXT NOT NULL,
            approved INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            text TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Slugs are unique per table; lookups go through these too
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_posts_slug ON posts(slug);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_slug ON tags(slug);
        CREATE INDEX IF NOT EXISTS idx_posts_tags_tag ON posts_tags(tag_id);
        CREATE INDEX IF NOT EXISTS idx_comments_post_parent ON comments(post_id, parent_id);
        CREATE INDEX IF NOT EXISTS idx_comments_created_at ON comments(created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_unread ON messages(is_read, created_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    use super::{init_database, Repository};
    use crate::models::{PostDraft, TagInput};
    use crate::services::{Clock, Services};

    /// Advances one second per reading so timestamps are strictly ordered.
    pub struct SteppingClock {
        seconds: AtomicI64,
    }

    impl SteppingClock {
        pub fn new() -> Self {
            Self {
                seconds: AtomicI64::new(1_700_000_000),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let s = self.seconds.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(s, 0).single().unwrap_or_else(Utc::now)
        }
    }

    pub async fn repository() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .expect("Failed to init DB");
        let services = Services {
            clock: Arc::new(SteppingClock::new()),
            ..Services::default()
        };
        (Repository::with_services(pool, services), temp_dir)
    }

    pub fn draft(title: &str, published: bool, tags: &[&str]) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            slug: None,
            markdown: format!("# {}\n\nBody of {}.", title, title),
            is_published: published,
            is_page: false,
            allow_comment: true,
            tags: TagInput::List(tags.iter().map(|t| t.to_string()).collect()),
            author_id: 1,
        }
    }
}
