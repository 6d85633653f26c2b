//! Accounts, login and twitter handles.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use doordont_core::UserId;
use doordont_storage::UserStore;

use crate::state::AppState;

use super::{api_error, store_error, ApiError};

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserCreated {
    pub id: UserId,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub authenticated: bool,
}

#[derive(Deserialize, Serialize)]
pub struct TwitterHandle {
    pub twitter: Option<String>,
}

pub async fn users_create(
    State(state): State<Arc<AppState>>,
    Json(input): Json<Credentials>,
) -> Result<(StatusCode, Json<UserCreated>), ApiError> {
    let username = input.username.trim();
    if username.is_empty() || input.password.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "username and password are required",
        ));
    }

    let id = state
        .store
        .insert_user(username, &input.password)
        .await
        .map_err(store_error)?;
    info!(user_id = id, "User registered");
    Ok((StatusCode::CREATED, Json(UserCreated { id })))
}

/// Wrong passwords and unknown users both yield `authenticated: false`.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(input): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let authenticated = state
        .store
        .verify_user(input.username.trim(), &input.password)
        .await
        .map_err(store_error)?;
    Ok(Json(LoginResponse { authenticated }))
}

pub async fn twitter_get(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<TwitterHandle>, ApiError> {
    let twitter = state
        .store
        .get_twitter_handle(&username)
        .await
        .map_err(store_error)?;
    Ok(Json(TwitterHandle { twitter }))
}

/// An empty or missing handle clears it.
pub async fn twitter_set(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Json(input): Json<TwitterHandle>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .set_twitter_handle(&username, input.twitter.as_deref())
        .await
        .map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}
