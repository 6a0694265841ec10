//! Post model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Tag, TagInput};

/// A post or standalone page.
///
/// `published_at` is stamped once, on the first transition to published,
/// and survives later edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub uuid: String,
    pub title: String,
    pub slug: String,
    pub markdown: String,
    pub html: String,
    pub is_published: bool,
    pub is_page: bool,
    pub allow_comment: bool,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: i64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_by: Option<i64>,
    pub tags: Vec<Tag>,
}

impl Post {
    /// Comma-joined tag names, as shown in the editor.
    pub fn tag_string(&self) -> String {
        self.tags
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Request body for creating or updating a post.
///
/// Every save is a full write: the tag list replaces the post's tags.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub title: String,
    /// Explicit slug; falls back to the slugified title when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_page: bool,
    #[serde(default = "default_allow_comment")]
    pub allow_comment: bool,
    #[serde(default)]
    pub tags: TagInput,
    /// Id of the authoring user.
    #[serde(default)]
    pub author_id: i64,
}

fn default_allow_comment() -> bool {
    true
}

/// Sort order for post listings; always newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostOrder {
    #[default]
    Published,
    Created,
    Updated,
}

impl PostOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            PostOrder::Published => "published_at DESC, id DESC",
            PostOrder::Created => "created_at DESC, id DESC",
            PostOrder::Updated => "updated_at DESC, id DESC",
        }
    }
}

/// Filter for post listings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFilter {
    #[serde(default)]
    pub is_page: bool,
    #[serde(default)]
    pub only_published: bool,
    #[serde(default)]
    pub order: PostOrder,
}

impl PostFilter {
    pub fn published_posts() -> Self {
        Self {
            is_page: false,
            only_published: true,
            order: PostOrder::Published,
        }
    }
}
