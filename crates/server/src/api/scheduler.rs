use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use doordont_core::GoalId;

use crate::state::AppState;

#[derive(Serialize)]
pub struct JobsResponse {
    pub cadence: String,
    pub jobs: Vec<GoalId>,
}

/// Ids of goals with a live evaluation job.
pub async fn scheduler_jobs(State(state): State<Arc<AppState>>) -> Json<JobsResponse> {
    Json(JobsResponse {
        cadence: state.scheduler.cadence().to_string(),
        jobs: state.scheduler.scheduled_ids().await,
    })
}
