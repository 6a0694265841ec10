//! Comment API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{client_info, success, ApiResult, Page};
use crate::errors::AppError;
use crate::messages::{EventPayload, COMMENT};
use crate::models::{AdminReply, Comment, VisitorComment};
use crate::AppState;

/// Admin listing query: `?page=&approved=`.
#[derive(Debug, Deserialize)]
pub struct CommentListQuery {
    #[serde(default = "super::first_page")]
    pub page: i64,
    #[serde(default)]
    pub approved: bool,
}

/// A comment in the moderation list, with a quote of what it answers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationEntry {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub parent_quote: String,
}

/// GET /api/posts/:id/comments - Approved comments of a published post as a tree.
pub async fn get_comment_tree(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> ApiResult<Vec<Comment>> {
    match state.repo.get_post(post_id).await? {
        Some(post) if post.is_published => {}
        _ => return Err(AppError::NotFound(format!("Post {} not found", post_id))),
    }
    success(
        state
            .repo
            .comment_tree(post_id, state.config.comment_tree)
            .await?,
    )
}

/// POST /api/posts/:id/comments - Leave a comment for moderation.
pub async fn create_visitor_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
    Json(mut input): Json<VisitorComment>,
) -> ApiResult<Comment> {
    let (ip, user_agent) = client_info(&headers);
    input.ip = ip;
    input.user_agent = user_agent;

    let comment = state.repo.create_visitor_comment(post_id, &input).await?;
    state
        .messages
        .notify(COMMENT, EventPayload::Comment(comment.clone()))
        .await;
    success(comment)
}

/// GET /api/admin/comments - All comments, newest first.
pub async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<CommentListQuery>,
) -> ApiResult<Page<ModerationEntry>> {
    let (comments, pager) = state
        .repo
        .list_comments_page(query.page, state.config.comments_per_page, query.approved)
        .await?;

    let mut entries = Vec::with_capacity(comments.len());
    for comment in comments {
        let parent = if comment.is_reply() {
            state.repo.get_comment(comment.parent_id).await?
        } else {
            None
        };
        entries.push(ModerationEntry {
            parent_quote: comment.parent_quote(parent.as_ref()),
            comment,
        });
    }
    success(Page::checked((entries, pager))?)
}

/// PUT /api/admin/comments/:id/approve
pub async fn approve_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Comment> {
    success(state.repo.approve_comment(id).await?)
}

/// POST /api/admin/comments/:id/reply - Reply as an admin, approving the parent.
pub async fn reply_to_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(mut input): Json<AdminReply>,
) -> ApiResult<Comment> {
    let (ip, user_agent) = client_info(&headers);
    input.ip = ip;
    input.user_agent = user_agent;

    let reply = state.repo.create_reply(id, &input).await?;
    state
        .messages
        .notify(COMMENT, EventPayload::Comment(reply.clone()))
        .await;
    success(reply)
}

/// DELETE /api/admin/comments/:id - Delete a comment and its replies.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<u64> {
    success(state.repo.delete_comment(id).await?)
}
