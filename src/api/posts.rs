//! Post API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResult, Page, PageQuery};
use crate::errors::AppError;
use crate::models::{Post, PostDraft, PostFilter, PostOrder, Tag};
use crate::AppState;

/// Admin listing query: `?page=&isPage=&onlyPublished=&order=`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListQuery {
    #[serde(default = "super::first_page")]
    pub page: i64,
    #[serde(default)]
    pub is_page: bool,
    #[serde(default)]
    pub only_published: bool,
    #[serde(default)]
    pub order: PostOrder,
}

impl PostListQuery {
    fn filter(&self) -> PostFilter {
        PostFilter {
            is_page: self.is_page,
            only_published: self.only_published,
            order: self.order,
        }
    }
}

/// GET /api/posts - Published posts, one page.
pub async fn list_published_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<Post>> {
    let listing = state
        .repo
        .list_posts_page(query.page, state.config.posts_per_page, PostFilter::published_posts())
        .await?;
    success(Page::checked(listing)?)
}

/// GET /api/posts/:id - A published post.
pub async fn get_published_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Post> {
    match state.repo.get_post(id).await? {
        Some(post) if post.is_published => success(post),
        _ => Err(AppError::NotFound(format!("Post {} not found", id))),
    }
}

/// GET /api/posts/slug/:slug - A published post by slug.
pub async fn get_published_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Post> {
    match state.repo.get_post_by_slug(&slug).await? {
        Some(post) if post.is_published => success(post),
        _ => Err(AppError::NotFound(format!("Post {:?} not found", slug))),
    }
}

/// GET /api/admin/posts - Any posts, one page.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> ApiResult<Page<Post>> {
    let listing = state
        .repo
        .list_posts_page(query.page, state.config.posts_per_page, query.filter())
        .await?;
    success(Page::checked(listing)?)
}

/// GET /api/admin/posts/all - Every post matching the filter.
pub async fn list_all_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> ApiResult<Vec<Post>> {
    success(state.repo.list_all_posts(query.filter()).await?)
}

/// GET /api/admin/posts/:id - A post, published or not.
pub async fn get_post(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Post> {
    match state.repo.get_post(id).await? {
        Some(post) => success(post),
        None => Err(AppError::NotFound(format!("Post {} not found", id))),
    }
}

/// GET /api/admin/posts/:id/tags - Tags of a post, hidden ones included.
pub async fn list_post_tags(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Tag>> {
    if state.repo.get_post(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Post {} not found", id)));
    }
    success(state.repo.list_tags_by_post(id).await?)
}

/// POST /api/admin/posts - Create a post.
pub async fn create_post(
    State(state): State<AppState>,
    Json(draft): Json<PostDraft>,
) -> ApiResult<Post> {
    success(state.repo.create_post(&draft).await?)
}

/// PUT /api/admin/posts/:id - Replace a post's content and tags.
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<PostDraft>,
) -> ApiResult<Post> {
    success(state.repo.update_post(id, &draft).await?)
}

/// DELETE /api/admin/posts/:id - Delete a post with its comments.
pub async fn delete_post(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    state.repo.delete_post(id).await?;
    success(())
}
