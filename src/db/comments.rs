//! Comment persistence: visitor comments, admin replies and moderation.

use sqlx::{Row, SqliteConnection};

use super::repository::{comment_from_row, Repository, COMMENT_COLUMNS};
use crate::comments::{build_forest, escape_visitor_content, validate_visitor_comment, CommentTreeMode};
use crate::errors::AppError;
use crate::models::{AdminReply, Comment, VisitorComment};
use crate::pager::Pager;

impl Repository {
    /// Get a comment by ID.
    pub async fn get_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    /// Approved comments of a post as a forest of top-level threads.
    pub async fn comment_tree(
        &self,
        post_id: i64,
        mode: CommentTreeMode,
    ) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM comments WHERE post_id = ? AND approved = 1 ORDER BY created_at, id",
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(build_forest(rows.iter().map(comment_from_row).collect(), mode))
    }

    /// One page of comments across all posts, newest first.
    pub async fn list_comments_page(
        &self,
        page: i64,
        size: i64,
        only_approved: bool,
    ) -> Result<(Vec<Comment>, Pager), AppError> {
        let filter = if only_approved { "WHERE approved = 1" } else { "" };

        let row = sqlx::query(&format!("SELECT COUNT(*) AS total FROM comments {}", filter))
            .fetch_one(&self.pool)
            .await?;
        let pager = Pager::compute(page, size, row.get("total"));

        if !pager.is_valid {
            return Ok((Vec::new(), pager));
        }

        let rows = sqlx::query(&format!(
            "SELECT {} FROM comments {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            COMMENT_COLUMNS, filter
        ))
        .bind(pager.limit())
        .bind(pager.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.iter().map(comment_from_row).collect(), pager))
    }

    /// Store a visitor comment awaiting moderation.
    pub async fn create_visitor_comment(
        &self,
        post_id: i64,
        input: &VisitorComment,
    ) -> Result<Comment, AppError> {
        validate_visitor_comment(input)?;

        let post = self
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;
        if !post.allow_comment {
            return Err(AppError::Validation(
                "Comments are closed for this post.".to_string(),
            ));
        }

        if input.parent_id > 0 {
            let parent = self.get_comment(input.parent_id).await?;
            if !matches!(parent, Some(ref p) if p.post_id == post_id) {
                return Err(AppError::Validation(format!(
                    "Parent comment {} does not belong to this post",
                    input.parent_id
                )));
            }
        }

        let email = input.email.trim();
        let new = NewComment {
            post_id,
            parent_id: input.parent_id.max(0),
            author: input.author.trim(),
            email,
            avatar: self.services.avatars.avatar_url(email),
            website: input.website.trim(),
            ip: &input.ip,
            user_agent: &input.user_agent,
            user_id: 0,
            content: escape_visitor_content(&input.content),
            approved: false,
        };

        let mut tx = self.pool.begin().await?;
        let id = insert_comment(&mut tx, &new, self.now()).await?;
        recount_comments(&mut tx, post_id).await?;
        tx.commit().await?;

        tracing::info!("Visitor comment {} on post {} awaits approval", id, post_id);
        self.get_comment(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Comment {} vanished after insert", id)))
    }

    /// Reply to a comment as an admin; the parent is approved along the way.
    pub async fn create_reply(
        &self,
        parent_id: i64,
        input: &AdminReply,
    ) -> Result<Comment, AppError> {
        if input.author.trim().is_empty() || input.content.trim().is_empty() {
            return Err(AppError::Validation(
                "Author and content are required".to_string(),
            ));
        }

        let parent = self
            .get_comment(parent_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", parent_id)))?;

        let email = input.email.trim();
        let new = NewComment {
            post_id: parent.post_id,
            parent_id: parent.id,
            author: input.author.trim(),
            email,
            avatar: self.services.avatars.avatar_url(email),
            website: input.website.trim(),
            ip: &input.ip,
            user_agent: &input.user_agent,
            user_id: input.user_id,
            content: self.services.renderer.render(&input.content),
            approved: true,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE comments SET approved = 1 WHERE id = ?")
            .bind(parent.id)
            .execute(&mut *tx)
            .await?;
        let id = insert_comment(&mut tx, &new, self.now()).await?;
        recount_comments(&mut tx, parent.post_id).await?;
        tx.commit().await?;

        tracing::info!("Reply {} to comment {} posted", id, parent.id);
        self.get_comment(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Comment {} vanished after insert", id)))
    }

    /// Mark a comment approved.
    pub async fn approve_comment(&self, id: i64) -> Result<Comment, AppError> {
        let result = sqlx::query("UPDATE comments SET approved = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }

        self.get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))
    }

    /// Delete a comment and every reply beneath it.
    pub async fn delete_comment(&self, id: i64) -> Result<u64, AppError> {
        let comment = self
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))?;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"WITH RECURSIVE subtree(id) AS (
                   SELECT ?
                   UNION ALL
                   SELECT c.id FROM comments c JOIN subtree s ON c.parent_id = s.id
               )
               DELETE FROM comments WHERE id IN (SELECT id FROM subtree)"#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        recount_comments(&mut tx, comment.post_id).await?;
        tx.commit().await?;

        let removed = result.rows_affected();
        tracing::info!("Deleted comment {} ({} row(s))", id, removed);
        Ok(removed)
    }
}

struct NewComment<'a> {
    post_id: i64,
    parent_id: i64,
    author: &'a str,
    email: &'a str,
    avatar: String,
    website: &'a str,
    ip: &'a str,
    user_agent: &'a str,
    user_id: i64,
    content: String,
    approved: bool,
}

async fn insert_comment(
    conn: &mut SqliteConnection,
    new: &NewComment<'_>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<i64, AppError> {
    let result = sqlx::query(
        r#"INSERT INTO comments (
            post_id, parent_id, author, email, avatar, website, ip, user_agent,
            user_id, content, approved, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new.post_id)
    .bind(new.parent_id)
    .bind(new.author)
    .bind(new.email)
    .bind(&new.avatar)
    .bind(new.website)
    .bind(new.ip)
    .bind(new.user_agent)
    .bind(new.user_id)
    .bind(&new.content)
    .bind(new.approved)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

async fn recount_comments(conn: &mut SqliteConnection, post_id: i64) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE posts SET comment_count = (SELECT COUNT(*) FROM comments WHERE post_id = ?) \
         WHERE id = ?",
    )
    .bind(post_id)
    .bind(post_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{draft, repository};
    use crate::comments::CommentTreeMode;
    use crate::errors::AppError;
    use crate::models::{AdminReply, VisitorComment};

    fn visitor(parent_id: i64) -> VisitorComment {
        VisitorComment {
            author: "Reader".to_string(),
            email: "Reader@Example.com".to_string(),
            website: "https://reader.example.com".to_string(),
            content: "<script>x</script>\nthanks".to_string(),
            parent_id,
            ip: "10.0.0.1".to_string(),
            user_agent: "test-agent".to_string(),
        }
    }

    fn reply(content: &str) -> AdminReply {
        AdminReply {
            author: "Admin".to_string(),
            content: content.to_string(),
            user_id: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_visitor_comment_is_pending_and_escaped() {
        let (repo, _dir) = repository().await;
        let post = repo.create_post(&draft("Post", true, &[])).await.unwrap();

        let comment = repo.create_visitor_comment(post.id, &visitor(0)).await.unwrap();
        assert!(!comment.approved);
        assert!(!comment.content.contains("<script>"));
        assert!(comment.content.contains("<br/>"));
        assert!(comment.avatar.starts_with("https://www.gravatar.com/avatar/"));
        assert_eq!(comment.ip, "10.0.0.1");

        let post = repo.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.comment_count, 1);

        // Pending comments stay out of the public tree
        let tree = repo.comment_tree(post.id, CommentTreeMode::Nested).await.unwrap();
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_visitor_comment_is_not_stored() {
        let (repo, _dir) = repository().await;
        let post = repo.create_post(&draft("Post", true, &[])).await.unwrap();

        let mut input = visitor(0);
        input.author = String::new();
        let err = repo.create_visitor_comment(post.id, &input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let (all, _) = repo.list_comments_page(1, 10, false).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_closed_post_and_foreign_parent() {
        let (repo, _dir) = repository().await;

        let mut closed = draft("Closed", true, &[]);
        closed.allow_comment = false;
        let closed = repo.create_post(&closed).await.unwrap();
        let err = repo.create_visitor_comment(closed.id, &visitor(0)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let a = repo.create_post(&draft("A", true, &[])).await.unwrap();
        let b = repo.create_post(&draft("B", true, &[])).await.unwrap();
        let on_a = repo.create_visitor_comment(a.id, &visitor(0)).await.unwrap();
        let err = repo
            .create_visitor_comment(b.id, &visitor(on_a.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = repo.create_visitor_comment(999, &visitor(0)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reply_approves_parent() {
        let (repo, _dir) = repository().await;
        let post = repo.create_post(&draft("Post", true, &[])).await.unwrap();
        let pending = repo.create_visitor_comment(post.id, &visitor(0)).await.unwrap();

        let answer = repo.create_reply(pending.id, &reply("Thanks *a lot*")).await.unwrap();
        assert!(answer.approved);
        assert_eq!(answer.parent_id, pending.id);
        assert!(answer.content.contains("<em>a lot</em>"));

        let parent = repo.get_comment(pending.id).await.unwrap().unwrap();
        assert!(parent.approved);

        let tree = repo.comment_tree(post.id, CommentTreeMode::Nested).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].id, answer.id);

        let err = repo.create_reply(999, &reply("hi")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_subtree_and_recounts() {
        let (repo, _dir) = repository().await;
        let post = repo.create_post(&draft("Post", true, &[])).await.unwrap();

        let root = repo.create_visitor_comment(post.id, &visitor(0)).await.unwrap();
        let child = repo.create_reply(root.id, &reply("one")).await.unwrap();
        repo.create_reply(child.id, &reply("two")).await.unwrap();
        let other = repo.create_visitor_comment(post.id, &visitor(0)).await.unwrap();

        let removed = repo.delete_comment(root.id).await.unwrap();
        assert_eq!(removed, 3);

        let post = repo.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.comment_count, 1);
        assert!(repo.get_comment(other.id).await.unwrap().is_some());

        let err = repo.delete_comment(root.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_approve_and_list() {
        let (repo, _dir) = repository().await;
        let post = repo.create_post(&draft("Post", true, &[])).await.unwrap();
        let first = repo.create_visitor_comment(post.id, &visitor(0)).await.unwrap();
        repo.create_visitor_comment(post.id, &visitor(0)).await.unwrap();

        let approved = repo.approve_comment(first.id).await.unwrap();
        assert!(approved.approved);

        let (visible, pager) = repo.list_comments_page(1, 10, true).await.unwrap();
        assert_eq!(pager.total, 1);
        assert_eq!(visible[0].id, first.id);

        let (all, _) = repo.list_comments_page(1, 10, false).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id > all[1].id);

        assert!(matches!(
            repo.approve_comment(999).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_parent_quote_reads_as_plain_text() {
        let (repo, _dir) = repository().await;
        let post = repo.create_post(&draft("Post", true, &[])).await.unwrap();

        let mut input = visitor(0);
        input.content = "Nice post, thanks".to_string();
        let root = repo.create_visitor_comment(post.id, &input).await.unwrap();
        assert_eq!(root.content, "Nice post, thanks");

        let answer = repo.create_reply(root.id, &reply("Glad")).await.unwrap();
        let parent = repo.get_comment(answer.parent_id).await.unwrap();
        assert_eq!(
            answer.parent_quote(parent.as_ref()),
            "> @Reader\n\n> Nice post, thanks\n"
        );
    }
}
