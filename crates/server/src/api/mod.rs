//! HTTP endpoint modules.
//!
//! Shared error types live here in mod.rs.

mod goals;
mod health;
mod scheduler;
mod users;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use doordont_storage::StoreError;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Map a store failure to its HTTP status.
pub(crate) fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::NotFound(_) | StoreError::UnknownUser(_) => StatusCode::NOT_FOUND,
        StoreError::DuplicateUsername(_) => StatusCode::CONFLICT,
        StoreError::InvalidGoal(_) => StatusCode::BAD_REQUEST,
        StoreError::Storage(_) => {
            warn!(error = %e, "Store error while handling request");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, e.to_string())
}

// ── Re-exports ───────────────────────────────────────────────────

pub use goals::{
    goals_create, goals_delete, goals_evaluate, goals_increment, goals_list, goals_reset,
};
pub use health::health;
pub use scheduler::scheduler_jobs;
pub use users::{login, twitter_get, twitter_set, users_create};
