use std::sync::Arc;

use doordont_core::config::OperatingMode;
use doordont_scheduler::GoalScheduler;
use doordont_storage::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub scheduler: Arc<GoalScheduler>,
    pub mode: OperatingMode,
}
