use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    #[error("Unknown punishment: {0}")]
    UnknownPunishment(String),
}
