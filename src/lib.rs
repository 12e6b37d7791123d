pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    store::{PostStore, UserStore, VoteStore},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub votes: Arc<dyn VoteStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new<S>(store: S, config: Config) -> Self
    where
        S: UserStore + PostStore + VoteStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            posts: store.clone(),
            votes: store,
            config: Arc::new(config),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid allowed origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/users/signup", post(handlers::users::signup))
        .route("/api/users/login", post(handlers::users::login));

    // Protected routes
    let protected_routes = Router::new()
        .route("/api/posts", get(handlers::posts::get_posts))
        .route("/api/posts", post(handlers::posts::create_post))
        .route("/api/posts/{post_id}", put(handlers::posts::edit_post))
        .route("/api/posts/{post_id}", delete(handlers::posts::delete_post))
        .route(
            "/api/posts/{post_id}/like",
            put(handlers::posts::like_or_dislike_post),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
