//! Comment model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reader or admin comment. Only `approved` changes after creation.
///
/// `parent_id == 0` marks a top-level comment. `children` is filled only by
/// the tree builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: i64,
    pub author: String,
    pub email: String,
    pub avatar: String,
    pub website: String,
    pub ip: String,
    pub user_agent: String,
    pub user_id: i64,
    pub content: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Comment>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id > 0
    }

    /// Markdown quote of the parent comment, empty for top-level comments.
    pub fn parent_quote(&self, parent: Option<&Comment>) -> String {
        if !self.is_reply() {
            return String::new();
        }
        match parent {
            Some(p) => format!("> @{}\n\n> {}\n", p.author, p.content),
            None => "> Comment not found.".to_string(),
        }
    }
}

/// Request body for a comment left by a visitor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorComment {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parent_id: i64,
    #[serde(skip)]
    pub ip: String,
    #[serde(skip)]
    pub user_agent: String,
}

/// Request body for an admin reply to an existing comment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReply {
    pub author: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    pub content: String,
    #[serde(default)]
    pub user_id: i64,
    #[serde(skip)]
    pub ip: String,
    #[serde(skip)]
    pub user_agent: String,
}
