//! Tag API endpoints. Only visible tags are public.

use axum::extract::{Path, Query, State};

use super::{success, ApiResult, Page, PageQuery};
use crate::errors::AppError;
use crate::models::{Post, Tag};
use crate::AppState;

/// GET /api/tags - List visible tags.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<Tag>> {
    success(state.repo.list_tags(true).await?)
}

/// GET /api/tags/:id
pub async fn get_tag(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Tag> {
    match state.repo.get_tag(id).await? {
        Some(tag) if !tag.hidden => success(tag),
        _ => Err(AppError::NotFound(format!("Tag {} not found", id))),
    }
}

/// GET /api/tags/slug/:slug
pub async fn get_tag_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Tag> {
    visible_tag(&state, &slug).await.and_then(success)
}

/// GET /api/tags/slug/:slug/posts - Published posts carrying the tag.
pub async fn list_posts_by_tag(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<Post>> {
    let tag = visible_tag(&state, &slug).await?;
    let listing = state
        .repo
        .list_posts_by_tag_page(tag.id, query.page, state.config.posts_per_page)
        .await?;
    success(Page::checked(listing)?)
}

async fn visible_tag(state: &AppState, slug: &str) -> Result<Tag, AppError> {
    match state.repo.get_tag_by_slug(slug).await? {
        Some(tag) if !tag.hidden => Ok(tag),
        _ => Err(AppError::NotFound(format!("Tag {:?} not found", slug))),
    }
}
