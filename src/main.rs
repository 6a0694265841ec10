//! Lectern blog backend
//!
//! Content engine for a small blog: posts with tags, threaded comments and an
//! admin inbox, persisted in SQLite and served as JSON.

mod api;
mod auth;
mod comments;
mod config;
mod db;
mod errors;
mod messages;
mod models;
mod pager;
mod services;
mod slug;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use messages::{FormatterRegistry, MessageGenerator};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub messages: Arc<MessageGenerator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(repo: Repository, config: Config) -> Self {
        let repo = Arc::new(repo);
        let messages = MessageGenerator::new(repo.clone(), Arc::new(FormatterRegistry::default()));
        Self {
            repo,
            messages: Arc::new(messages),
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Lectern backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Comment tree: {:?}", config.comment_tree);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (LECTERN_API_PSK). Admin routes are open!");
    }

    let pool = db::init_database(&config.db_path).await?;
    let state = AppState::new(Repository::new(pool), config.clone());

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let public_routes = Router::new()
        // Posts
        .route("/posts", get(api::list_published_posts))
        .route("/posts/{id}", get(api::get_published_post))
        .route("/posts/slug/{slug}", get(api::get_published_post_by_slug))
        // Comments
        .route("/posts/{id}/comments", get(api::get_comment_tree))
        .route("/posts/{id}/comments", post(api::create_visitor_comment))
        // Tags
        .route("/tags", get(api::list_tags))
        .route("/tags/{id}", get(api::get_tag))
        .route("/tags/slug/{slug}", get(api::get_tag_by_slug))
        .route("/tags/slug/{slug}/posts", get(api::list_posts_by_tag));

    let admin_routes = Router::new()
        // Posts
        .route("/posts", get(api::list_posts))
        .route("/posts", post(api::create_post))
        .route("/posts/all", get(api::list_all_posts))
        .route("/posts/{id}", get(api::get_post))
        .route("/posts/{id}", put(api::update_post))
        .route("/posts/{id}", delete(api::delete_post))
        .route("/posts/{id}/tags", get(api::list_post_tags))
        // Comments
        .route("/comments", get(api::list_comments))
        .route("/comments/{id}", delete(api::delete_comment))
        .route("/comments/{id}/approve", put(api::approve_comment))
        .route("/comments/{id}/reply", post(api::reply_to_comment))
        // Messages
        .route("/messages", get(api::list_unread_messages))
        .route("/messages/{id}/read", put(api::mark_message_read))
        .route("/messages/backup", post(api::record_backup))
        .layer(middleware::from_fn(move |req, next| {
            auth::require_psk(psk.clone(), req, next)
        }));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api/admin", admin_routes)
        .nest("/api", public_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
