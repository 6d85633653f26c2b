//! Goal CRUD, counter updates and manual evaluation.
//!
//! Creating a goal schedules its evaluation job; deleting it cancels the job.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use doordont_core::{Goal, GoalId, GoalMode, NewGoal, Punishment};
use doordont_scheduler::FireOutcome;
use doordont_storage::GoalStore;

use crate::state::AppState;

use super::{api_error, store_error, ApiError};

#[derive(Deserialize)]
pub struct GoalInput {
    pub description: String,
    pub punishment: String,
    /// `true` for a goal to start doing something, `false` to quit it.
    pub initiate: bool,
    pub frequency: u32,
    pub username: String,
}

impl GoalInput {
    fn into_new_goal(self) -> Result<NewGoal, ApiError> {
        let punishment: Punishment = self
            .punishment
            .parse()
            .map_err(|e: doordont_core::CoreError| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        let goal = NewGoal {
            description: self.description.trim().to_string(),
            punishment,
            mode: GoalMode::from_initiate(self.initiate),
            frequency: self.frequency,
            username: self.username.trim().to_string(),
        };
        goal.validate()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        Ok(goal)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalCreated {
    pub goal_id: GoalId,
}

#[derive(Deserialize)]
pub struct GoalListParams {
    pub username: String,
}

pub async fn goals_create(
    State(state): State<Arc<AppState>>,
    Json(input): Json<GoalInput>,
) -> Result<(StatusCode, Json<GoalCreated>), ApiError> {
    let goal = input.into_new_goal()?;
    let goal_id = state.store.insert_goal(goal).await.map_err(store_error)?;
    state.scheduler.schedule(goal_id).await;
    info!(goal_id, "Goal created");
    Ok((StatusCode::CREATED, Json(GoalCreated { goal_id })))
}

pub async fn goals_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GoalListParams>,
) -> Result<Json<Vec<Goal>>, ApiError> {
    state
        .store
        .list_goals_for_user(&params.username)
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn goals_increment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GoalId>,
) -> Result<StatusCode, ApiError> {
    state.store.increment_counter(id).await.map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn goals_reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GoalId>,
) -> Result<StatusCode, ApiError> {
    state.store.reset_counter(id).await.map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn goals_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GoalId>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_goal(id).await.map_err(store_error)?;
    state.scheduler.cancel(id).await;
    info!(goal_id = id, "Goal deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Run one evaluation now, outside the weekly cadence.
pub async fn goals_evaluate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GoalId>,
) -> Result<Json<FireOutcome>, ApiError> {
    match state.scheduler.run_now(id).await {
        FireOutcome::GoalMissing => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("goal {id} not found"),
        )),
        FireOutcome::Aborted { error } => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, error)),
        outcome => Ok(Json(outcome)),
    }
}
