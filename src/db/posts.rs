//! Post aggregate: save, delete and list.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

use super::repository::{post_from_row, Repository, POST_COLUMNS};
use super::tags::{evict_orphan_tags, refresh_tag_visibility, upsert_tag, TagOwner};
use crate::errors::AppError;
use crate::models::{Post, PostDraft, PostFilter, TagDraft};
use crate::pager::Pager;
use crate::slug::{self, slugify, SlugLookup};

#[async_trait]
impl SlugLookup for Repository {
    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM posts WHERE slug = ?) AS taken")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("taken") != 0)
    }
}

/// Checked input of a post save.
struct PreparedDraft<'a> {
    draft: &'a PostDraft,
    explicit_slug: Option<&'a str>,
    tags: Vec<TagDraft>,
}

impl<'a> PreparedDraft<'a> {
    /// Reject bad input before anything is written.
    fn new(draft: &'a PostDraft) -> Result<Self, AppError> {
        if draft.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }

        let explicit_slug = draft.slug.as_deref().filter(|s| !s.trim().is_empty());

        let mut tags: Vec<TagDraft> = Vec::new();
        for tag in draft.tags.clone().into_drafts() {
            if tag.slug.is_empty() {
                return Err(AppError::Validation(format!(
                    "Tag {:?} has no usable slug",
                    tag.name
                )));
            }
            if !tags.iter().any(|t| t.slug == tag.slug) {
                tags.push(tag);
            }
        }

        Ok(Self {
            draft,
            explicit_slug,
            tags,
        })
    }

    /// The requested slug, else `fallback`.
    fn slug_or(&self, fallback: &str) -> String {
        self.explicit_slug.unwrap_or(fallback).to_string()
    }
}

impl Repository {
    /// Get a post by ID, tags attached.
    pub async fn get_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row.as_ref().map(post_from_row) {
            Some(mut post) => {
                post.tags = self.list_tags_by_post(post.id).await?;
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    /// Get a post by slug, tags attached.
    pub async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        match row.as_ref().map(post_from_row) {
            Some(mut post) => {
                post.tags = self.list_tags_by_post(post.id).await?;
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    /// Create a post from a draft and attach its tags.
    pub async fn create_post(&self, draft: &PostDraft) -> Result<Post, AppError> {
        let prepared = PreparedDraft::new(draft)?;
        let slug = slug::resolve(&prepared.slug_or(&slugify(&draft.title)), self).await?;

        let now = self.now();
        let author = draft.author_id;
        let (published_at, published_by) = if draft.is_published {
            (Some(now), Some(author))
        } else {
            (None, None)
        };
        let html = self.services.renderer.render(&draft.markdown);

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"INSERT INTO posts (
                uuid, title, slug, markdown, html, is_published, is_page, allow_comment,
                comment_count, created_at, created_by, updated_at, updated_by,
                published_at, published_by
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(self.services.ids.next_id())
        .bind(draft.title.trim())
        .bind(&slug)
        .bind(&draft.markdown)
        .bind(&html)
        .bind(draft.is_published)
        .bind(draft.is_page)
        .bind(draft.allow_comment)
        .bind(now)
        .bind(author)
        .bind(now)
        .bind(author)
        .bind(published_at)
        .bind(published_by)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        let owner = TagOwner {
            post_id: id,
            is_published: draft.is_published,
            author_id: author,
        };
        replace_post_tags(&mut tx, owner, &prepared.tags, now).await?;

        tx.commit().await?;

        let post = self
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Post {} vanished after insert", id)))?;
        tracing::info!("Created post {} ({}) tags=[{}]", post.id, post.slug, post.tag_string());
        Ok(post)
    }

    /// Update a post from a draft; the draft's tags replace the old ones.
    pub async fn update_post(&self, id: i64, draft: &PostDraft) -> Result<Post, AppError> {
        let prepared = PreparedDraft::new(draft)?;
        let current = self
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;

        // Without an explicit slug the post keeps the one it has
        let slug = slug::resolve_for_update(&prepared.slug_or(&current.slug), &current.slug, self)
            .await?;

        let now = self.now();
        let author = draft.author_id;
        // First publication only; later edits keep the original stamp
        let (published_at, published_by) = if draft.is_published && current.published_at.is_none()
        {
            (Some(now), Some(author))
        } else {
            (current.published_at, current.published_by)
        };
        let html = self.services.renderer.render(&prepared.draft.markdown);

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"UPDATE posts SET
                title = ?, slug = ?, markdown = ?, html = ?, is_published = ?, is_page = ?,
                allow_comment = ?, updated_at = ?, updated_by = ?, published_at = ?,
                published_by = ?
            WHERE id = ?"#,
        )
        .bind(draft.title.trim())
        .bind(&slug)
        .bind(&draft.markdown)
        .bind(&html)
        .bind(draft.is_published)
        .bind(draft.is_page)
        .bind(draft.allow_comment)
        .bind(now)
        .bind(author)
        .bind(published_at)
        .bind(published_by)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }

        let owner = TagOwner {
            post_id: id,
            is_published: draft.is_published,
            author_id: author,
        };
        replace_post_tags(&mut tx, owner, &prepared.tags, now).await?;

        tx.commit().await?;

        let post = self
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;
        tracing::info!("Updated post {} ({}) tags=[{}]", post.id, post.slug, post.tag_string());
        Ok(post)
    }

    /// Delete a post with its associations and comments, then evict orphan tags.
    pub async fn delete_post(&self, id: i64) -> Result<(), AppError> {
        let now = self.now();
        let mut tx = self.pool.begin().await?;

        let previous = post_tag_ids(&mut tx, id).await?;

        sqlx::query("DELETE FROM posts_tags WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }

        refresh_tag_visibility(&mut tx, &previous, now).await?;
        evict_orphan_tags(&mut tx).await?;

        tx.commit().await?;
        tracing::info!("Deleted post {}", id);
        Ok(())
    }

    /// One page of posts matching `filter`.
    ///
    /// An out-of-range page yields no rows; callers check `pager.is_valid`.
    pub async fn list_posts_page(
        &self,
        page: i64,
        size: i64,
        filter: PostFilter,
    ) -> Result<(Vec<Post>, Pager), AppError> {
        let where_clause = filter_clause(filter);
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM posts {}",
            where_clause
        ))
        .fetch_one(&self.pool)
        .await?;
        let pager = Pager::compute(page, size, row.get("total"));

        if !pager.is_valid {
            return Ok((Vec::new(), pager));
        }

        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts {} ORDER BY {} LIMIT ? OFFSET ?",
            POST_COLUMNS,
            where_clause,
            filter.order.sql()
        ))
        .bind(pager.limit())
        .bind(pager.offset())
        .fetch_all(&self.pool)
        .await?;

        let posts = self.with_tags(rows.iter().map(post_from_row).collect()).await?;
        Ok((posts, pager))
    }

    /// Every post matching `filter`.
    pub async fn list_all_posts(&self, filter: PostFilter) -> Result<Vec<Post>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts {} ORDER BY {}",
            POST_COLUMNS,
            filter_clause(filter),
            filter.order.sql()
        ))
        .fetch_all(&self.pool)
        .await?;

        self.with_tags(rows.iter().map(post_from_row).collect()).await
    }

    /// One page of published posts carrying the tag, newest publication first.
    pub async fn list_posts_by_tag_page(
        &self,
        tag_id: i64,
        page: i64,
        size: i64,
    ) -> Result<(Vec<Post>, Pager), AppError> {
        let row = sqlx::query(
            r#"SELECT COUNT(*) AS total
               FROM posts p JOIN posts_tags pt ON pt.post_id = p.id
               WHERE pt.tag_id = ? AND p.is_published = 1"#,
        )
        .bind(tag_id)
        .fetch_one(&self.pool)
        .await?;
        let pager = Pager::compute(page, size, row.get("total"));

        if !pager.is_valid {
            return Ok((Vec::new(), pager));
        }

        let rows = sqlx::query(
            r#"SELECT p.id, p.uuid, p.title, p.slug, p.markdown, p.html, p.is_published,
                      p.is_page, p.allow_comment, p.comment_count, p.created_at, p.created_by,
                      p.updated_at, p.updated_by, p.published_at, p.published_by
               FROM posts p JOIN posts_tags pt ON pt.post_id = p.id
               WHERE pt.tag_id = ? AND p.is_published = 1
               ORDER BY p.published_at DESC, p.id DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(tag_id)
        .bind(pager.limit())
        .bind(pager.offset())
        .fetch_all(&self.pool)
        .await?;

        let posts = self.with_tags(rows.iter().map(post_from_row).collect()).await?;
        Ok((posts, pager))
    }

    async fn with_tags(&self, mut posts: Vec<Post>) -> Result<Vec<Post>, AppError> {
        for post in &mut posts {
            post.tags = self.list_tags_by_post(post.id).await?;
        }
        Ok(posts)
    }
}

fn filter_clause(filter: PostFilter) -> String {
    let mut clause = format!("WHERE is_page = {}", i32::from(filter.is_page));
    if filter.only_published {
        clause.push_str(" AND is_published = 1");
    }
    clause
}

async fn post_tag_ids(conn: &mut SqliteConnection, post_id: i64) -> Result<Vec<i64>, AppError> {
    let rows = sqlx::query("SELECT tag_id FROM posts_tags WHERE post_id = ? ORDER BY id")
        .bind(post_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.iter().map(|r| r.get("tag_id")).collect())
}

/// Make the post's associations exactly `tags`, fix visibility of tags it
/// dropped, and evict tags nothing references any more.
async fn replace_post_tags(
    conn: &mut SqliteConnection,
    owner: TagOwner,
    tags: &[TagDraft],
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let previous = post_tag_ids(conn, owner.post_id).await?;

    let mut tag_ids = Vec::with_capacity(tags.len());
    for tag in tags {
        let id = upsert_tag(conn, tag, owner, now).await?;
        if !tag_ids.contains(&id) {
            tag_ids.push(id);
        }
    }

    sqlx::query("DELETE FROM posts_tags WHERE post_id = ?")
        .bind(owner.post_id)
        .execute(&mut *conn)
        .await?;
    for tag_id in &tag_ids {
        sqlx::query("INSERT INTO posts_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(owner.post_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }

    let detached: Vec<i64> = previous
        .into_iter()
        .filter(|id| !tag_ids.contains(id))
        .collect();
    refresh_tag_visibility(conn, &detached, now).await?;
    evict_orphan_tags(conn).await?;
    Ok(())
}
