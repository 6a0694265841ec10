//! Tag lifecycle: slug upsert, visibility tracking and orphan eviction.
//!
//! The write-side functions take a bare connection so the post aggregate can
//! run them inside its own transaction.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

use super::repository::{tag_from_row, Repository, TAG_COLUMNS};
use crate::errors::AppError;
use crate::models::{Tag, TagDraft};

/// The post a tag is being upserted for.
#[derive(Debug, Clone, Copy)]
pub(super) struct TagOwner {
    pub post_id: i64,
    pub is_published: bool,
    pub author_id: i64,
}

impl Repository {
    /// Get a tag by ID.
    pub async fn get_tag(&self, id: i64) -> Result<Option<Tag>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(tag_from_row))
    }

    /// Get a tag by slug.
    pub async fn get_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM tags WHERE slug = ?", TAG_COLUMNS))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(tag_from_row))
    }

    /// List all tags, hidden ones included unless `only_visible`.
    pub async fn list_tags(&self, only_visible: bool) -> Result<Vec<Tag>, AppError> {
        let filter = if only_visible { "WHERE hidden = 0" } else { "" };
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tags {} ORDER BY name",
            TAG_COLUMNS, filter
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    /// List the tags attached to a post, in association order.
    pub async fn list_tags_by_post(&self, post_id: i64) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query(
            r#"SELECT t.id, t.name, t.slug, t.hidden, t.created_at, t.created_by,
                      t.updated_at, t.updated_by
               FROM tags t JOIN posts_tags pt ON pt.tag_id = t.id
               WHERE pt.post_id = ?
               ORDER BY pt.id"#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tag_from_row).collect())
    }
}

/// Match `draft` by slug, inserting it when new, and return its id.
///
/// A new tag is hidden iff its owner is unpublished. An existing tag is made
/// visible whenever a published owner uses it, but is only hidden again when
/// no other published post still references it.
pub(super) async fn upsert_tag(
    conn: &mut SqliteConnection,
    draft: &TagDraft,
    owner: TagOwner,
    now: DateTime<Utc>,
) -> Result<i64, AppError> {
    let desired_hidden = !owner.is_published;

    let existing = sqlx::query(&format!("SELECT {} FROM tags WHERE slug = ?", TAG_COLUMNS))
        .bind(&draft.slug)
        .fetch_optional(&mut *conn)
        .await?
        .as_ref()
        .map(tag_from_row);

    let Some(existing) = existing else {
        let result = sqlx::query(
            "INSERT INTO tags (name, slug, hidden, created_at, created_by) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(desired_hidden)
        .bind(now)
        .bind(owner.author_id)
        .execute(&mut *conn)
        .await?;
        return Ok(result.last_insert_rowid());
    };

    if existing.hidden != desired_hidden {
        let apply = if existing.hidden {
            true
        } else {
            !published_referencer_exists(conn, existing.id, Some(owner.post_id)).await?
        };
        if apply {
            set_hidden(conn, existing.id, desired_hidden, now, owner.author_id).await?;
        } else {
            tracing::debug!(
                "Tag {} stays visible: another published post references it",
                existing.slug
            );
        }
    }

    Ok(existing.id)
}

/// Recompute `hidden` for tags that just lost a post.
pub(super) async fn refresh_tag_visibility(
    conn: &mut SqliteConnection,
    tag_ids: &[i64],
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    for &tag_id in tag_ids {
        let hidden = !published_referencer_exists(conn, tag_id, None).await?;
        sqlx::query("UPDATE tags SET hidden = ?, updated_at = ? WHERE id = ? AND hidden != ?")
            .bind(hidden)
            .bind(now)
            .bind(tag_id)
            .bind(hidden)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Delete every tag with no association rows, regardless of `hidden`.
pub(super) async fn evict_orphan_tags(conn: &mut SqliteConnection) -> Result<u64, AppError> {
    let result =
        sqlx::query("DELETE FROM tags WHERE id NOT IN (SELECT tag_id FROM posts_tags)")
            .execute(&mut *conn)
            .await?;

    let evicted = result.rows_affected();
    if evicted > 0 {
        tracing::debug!("Evicted {} orphan tag(s)", evicted);
    }
    Ok(evicted)
}

async fn published_referencer_exists(
    conn: &mut SqliteConnection,
    tag_id: i64,
    excluding_post: Option<i64>,
) -> Result<bool, AppError> {
    let row = sqlx::query(
        r#"SELECT EXISTS (
               SELECT 1 FROM posts_tags pt JOIN posts p ON p.id = pt.post_id
               WHERE pt.tag_id = ? AND p.is_published = 1 AND p.id != ?
           ) AS referenced"#,
    )
    .bind(tag_id)
    .bind(excluding_post.unwrap_or(0))
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.get::<i64, _>("referenced") != 0)
}

async fn set_hidden(
    conn: &mut SqliteConnection,
    tag_id: i64,
    hidden: bool,
    now: DateTime<Utc>,
    by: i64,
) -> Result<(), AppError> {
    sqlx::query("UPDATE tags SET hidden = ?, updated_at = ?, updated_by = ? WHERE id = ?")
        .bind(hidden)
        .bind(now)
        .bind(by)
        .bind(tag_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
