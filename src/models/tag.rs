//! Tag model and tag input parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::slug::slugify;

/// A tag attached to posts through the posts_tags join.
///
/// `hidden` is true exactly when no published post references the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<i64>,
}

/// A tag as supplied to a post save, before it is matched by slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDraft {
    pub name: String,
    pub slug: String,
}

impl TagDraft {
    pub fn new(name: &str) -> Self {
        let name = name.trim();
        Self {
            name: name.to_string(),
            slug: slugify(name),
        }
    }
}

/// Tags arrive either as a JSON list of names or as one comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagInput {
    List(Vec<String>),
    Comma(String),
}

impl Default for TagInput {
    fn default() -> Self {
        TagInput::List(Vec::new())
    }
}

impl TagInput {
    pub fn into_drafts(self) -> Vec<TagDraft> {
        match self {
            TagInput::List(names) => names
                .iter()
                .map(String::as_str)
                .filter(|n| !n.trim().is_empty())
                .map(TagDraft::new)
                .collect(),
            TagInput::Comma(input) => tags_from_comma_string(&input),
        }
    }
}

/// Split `"Rust, Web ,,Go"` into drafts, dropping blank entries.
pub fn tags_from_comma_string(input: &str) -> Vec<TagDraft> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(TagDraft::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_string_parsing() {
        let drafts = tags_from_comma_string(" Welcome, Rust Lang ,, ");
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].name, "Welcome");
        assert_eq!(drafts[0].slug, "welcome");
        assert_eq!(drafts[1].slug, "rust-lang");
    }

    #[test]
    fn test_tag_input_deserializes_both_shapes() {
        let list: TagInput = serde_json::from_str(r#"["A", " ", "B c"]"#).unwrap();
        let comma: TagInput = serde_json::from_str(r#""A, B c""#).unwrap();
        assert_eq!(list.into_drafts(), comma.into_drafts());
    }
}
