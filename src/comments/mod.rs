//! Comment tree reconstruction from flat parent-pointer rows.

mod validate;

pub use validate::*;

use std::collections::HashMap;

use crate::models::Comment;

/// How replies are arranged under their top-level comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommentTreeMode {
    /// Every comment hangs under its direct parent, at any depth.
    #[default]
    Nested,
    /// Replies to a top-level comment keep their own children, but every
    /// deeper descendant is flattened into the depth-1 reply's list.
    Flattened,
}

impl CommentTreeMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nested" => Some(CommentTreeMode::Nested),
            "flattened" | "flat" => Some(CommentTreeMode::Flattened),
            _ => None,
        }
    }
}

/// Build the reply forest of one post.
///
/// `comments` are the post's approved rows in display order. Roots are the
/// rows with `parent_id == 0`; a reply whose parent is not in `comments`
/// is unreachable and dropped.
pub fn build_forest(comments: Vec<Comment>, mode: CommentTreeMode) -> Vec<Comment> {
    let mut roots = Vec::new();
    let mut by_parent: HashMap<i64, Vec<Comment>> = HashMap::new();
    for comment in comments {
        if comment.parent_id == 0 {
            roots.push(comment);
        } else {
            by_parent.entry(comment.parent_id).or_default().push(comment);
        }
    }

    for root in &mut roots {
        match mode {
            CommentTreeMode::Nested => attach_nested(root, &mut by_parent),
            CommentTreeMode::Flattened => {
                root.children = by_parent.remove(&root.id).unwrap_or_default();
                for reply in &mut root.children {
                    flatten_into(&mut reply.children, reply.id, &mut by_parent);
                }
            }
        }
    }
    roots
}

fn attach_nested(node: &mut Comment, by_parent: &mut HashMap<i64, Vec<Comment>>) {
    node.children = by_parent.remove(&node.id).unwrap_or_default();
    for child in &mut node.children {
        attach_nested(child, by_parent);
    }
}

/// Append all descendants of `parent_id` to `out`: a level's comments first,
/// then each of their subtrees in turn.
fn flatten_into(out: &mut Vec<Comment>, parent_id: i64, by_parent: &mut HashMap<i64, Vec<Comment>>) {
    let kids = by_parent.remove(&parent_id).unwrap_or_default();
    let ids: Vec<i64> = kids.iter().map(|c| c.id).collect();
    out.extend(kids);
    for id in ids {
        flatten_into(out, id, by_parent);
    }
}
