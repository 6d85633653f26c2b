use thiserror::Error;

use doordont_core::{CoreError, GoalId};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("goal not found: {0}")]
    NotFound(GoalId),

    #[error("user not found: {0}")]
    UnknownUser(String),

    #[error("username already taken: {0}")]
    DuplicateUsername(String),

    #[error("invalid goal: {0}")]
    InvalidGoal(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidGoal(msg) => StoreError::InvalidGoal(msg),
            other => StoreError::InvalidGoal(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Storage(format!("migration failed: {err}"))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
