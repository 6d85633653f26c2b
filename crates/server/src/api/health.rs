use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use doordont_core::config::OperatingMode;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub mode: OperatingMode,
    pub scheduled_goals: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        mode: state.mode,
        scheduled_goals: state.scheduler.scheduled_ids().await.len(),
    })
}
