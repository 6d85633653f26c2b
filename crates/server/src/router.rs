//! HTTP router construction.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/users", post(api::users_create))
        .route("/login", post(api::login))
        .route(
            "/users/{username}/twitter",
            get(api::twitter_get).put(api::twitter_set),
        )
        .route("/goals", get(api::goals_list).post(api::goals_create))
        .route("/goals/{id}", axum::routing::delete(api::goals_delete))
        .route("/goals/{id}/increment", post(api::goals_increment))
        .route("/goals/{id}/reset", post(api::goals_reset))
        .route("/goals/{id}/evaluate", post(api::goals_evaluate))
        .route("/scheduler/jobs", get(api::scheduler_jobs))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

/// `*` allows any origin; anything else must be a single valid origin.
fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::permissive().allow_origin(AllowOrigin::exact(value)),
        Err(e) => {
            warn!(origin, error = %e, "Invalid CORS origin, allowing any origin");
            CorsLayer::permissive()
        }
    }
}
