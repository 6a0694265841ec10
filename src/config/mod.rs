//! Configuration module for the Lectern backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::comments::CommentTreeMode;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key guarding the admin API
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Page size for post listings
    pub posts_per_page: i64,
    /// Page size for the admin comment listing
    pub comments_per_page: i64,
    /// Shape of the public comment tree
    pub comment_tree: CommentTreeMode,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("LECTERN_API_PSK").ok().filter(|s| !s.is_empty());

        let db_path = env::var("LECTERN_DB_PATH")
            .unwrap_or_else(|_| "./data/blog.sqlite".to_string())
            .into();

        let bind_addr = env::var("LECTERN_BIND_ADDR")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    tracing::warn!("Invalid LECTERN_BIND_ADDR {:?}, using default", raw);
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        let log_level = env::var("LECTERN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let posts_per_page = page_size_from_env("LECTERN_POSTS_PER_PAGE", 10);
        let comments_per_page = page_size_from_env("LECTERN_COMMENTS_PER_PAGE", 10);

        let comment_tree = env::var("LECTERN_COMMENT_TREE")
            .ok()
            .and_then(|s| CommentTreeMode::from_str(&s))
            .unwrap_or_default();

        Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            posts_per_page,
            comments_per_page,
            comment_tree,
        }
    }
}

/// Page sizes must stay positive; anything else falls back to the default.
fn page_size_from_env(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        env::remove_var("LECTERN_API_PSK");
        env::remove_var("LECTERN_DB_PATH");
        env::remove_var("LECTERN_BIND_ADDR");
        env::remove_var("LECTERN_LOG_LEVEL");
        env::remove_var("LECTERN_POSTS_PER_PAGE");
        env::remove_var("LECTERN_COMMENTS_PER_PAGE");
        env::remove_var("LECTERN_COMMENT_TREE");

        let config = Config::from_env();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/blog.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.posts_per_page, 10);
        assert_eq!(config.comments_per_page, 10);
        assert_eq!(config.comment_tree, CommentTreeMode::Nested);
    }

    #[test]
    fn test_page_size_rejects_non_positive() {
        env::set_var("LECTERN_TEST_PAGE_SIZE", "0");
        assert_eq!(page_size_from_env("LECTERN_TEST_PAGE_SIZE", 7), 7);
        env::set_var("LECTERN_TEST_PAGE_SIZE", "25");
        assert_eq!(page_size_from_env("LECTERN_TEST_PAGE_SIZE", 7), 25);
        env::remove_var("LECTERN_TEST_PAGE_SIZE");
    }
}
