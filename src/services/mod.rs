//! External collaborators consumed by the content engine.
//!
//! The engine only calls through these traits; the default implementations
//! wire in the real crates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Source of "now" for every timestamp the engine writes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Markdown source to HTML.
pub trait MarkupRenderer: Send + Sync {
    fn render(&self, source: &str) -> String;
}

/// CommonMark rendering with the usual GitHub extensions.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMarkRenderer;

impl MarkupRenderer for CommonMarkRenderer {
    fn render(&self, source: &str) -> String {
        let mut options = pulldown_cmark::Options::empty();
        options.insert(pulldown_cmark::Options::ENABLE_TABLES);
        options.insert(pulldown_cmark::Options::ENABLE_STRIKETHROUGH);
        options.insert(pulldown_cmark::Options::ENABLE_FOOTNOTES);

        let parser = pulldown_cmark::Parser::new_ext(source, options);
        let mut html = String::with_capacity(source.len() * 3 / 2);
        pulldown_cmark::html::push_html(&mut html, parser);
        html
    }
}

/// Email to avatar image URL.
pub trait AvatarLookup: Send + Sync {
    fn avatar_url(&self, email: &str) -> String;
}

/// Gravatar URLs keyed by the SHA-256 of the normalized email.
#[derive(Debug, Clone)]
pub struct Gravatar {
    pub size: u32,
}

impl Default for Gravatar {
    fn default() -> Self {
        Self { size: 50 }
    }
}

impl AvatarLookup for Gravatar {
    fn avatar_url(&self, email: &str) -> String {
        let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
        format!(
            "https://www.gravatar.com/avatar/{}?s={}&d=identicon",
            hex::encode(digest),
            self.size
        )
    }
}

/// Cosmetic entity identifiers; uniqueness of content hangs on slugs.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV4;

impl IdGenerator for UuidV4 {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// The full set of collaborators handed to the repository.
#[derive(Clone)]
pub struct Services {
    pub clock: Arc<dyn Clock>,
    pub renderer: Arc<dyn MarkupRenderer>,
    pub avatars: Arc<dyn AvatarLookup>,
    pub ids: Arc<dyn IdGenerator>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            renderer: Arc::new(CommonMarkRenderer),
            avatars: Arc::new(Gravatar::default()),
            ids: Arc::new(UuidV4),
        }
    }
}
