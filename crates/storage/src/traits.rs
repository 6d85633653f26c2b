//! Store traits shared by the in-memory and PostgreSQL backends.

use async_trait::async_trait;

use doordont_core::{Goal, GoalId, NewGoal, User, UserId};

use crate::error::StoreResult;

/// Goal persistence.
///
/// Counter mutations on one goal id are serialized by every implementation:
/// an increment racing a checkpoint either lands before the read or after
/// the reset, never in between.
#[async_trait]
pub trait GoalStore: Send + Sync {
    /// Insert a goal for an existing user with its counter at zero.
    async fn insert_goal(&self, goal: NewGoal) -> StoreResult<GoalId>;

    async fn get_goal(&self, id: GoalId) -> StoreResult<Goal>;

    async fn list_goals_for_user(&self, username: &str) -> StoreResult<Vec<Goal>>;

    /// Every persisted goal, ordered by id.
    async fn list_goals(&self) -> StoreResult<Vec<Goal>>;

    async fn increment_counter(&self, id: GoalId) -> StoreResult<()>;

    async fn reset_counter(&self, id: GoalId) -> StoreResult<()>;

    async fn delete_goal(&self, id: GoalId) -> StoreResult<()>;

    /// Read a goal for evaluation, resetting its counter in the same step
    /// when `reset` is set. The returned goal carries the pre-reset counter.
    async fn checkpoint_goal(&self, id: GoalId, reset: bool) -> StoreResult<Goal>;
}

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Register a user, hashing the password with a fresh salt.
    async fn insert_user(&self, username: &str, password: &str) -> StoreResult<UserId>;

    /// `Ok(false)` for unknown users as well as wrong passwords.
    async fn verify_user(&self, username: &str, password: &str) -> StoreResult<bool>;

    async fn get_user(&self, username: &str) -> StoreResult<User>;

    async fn get_user_by_id(&self, id: UserId) -> StoreResult<User>;

    async fn set_twitter_handle(&self, username: &str, handle: Option<&str>) -> StoreResult<()>;

    async fn get_twitter_handle(&self, username: &str) -> StoreResult<Option<String>>;
}

/// Both halves of the data layer behind one object.
pub trait Store: GoalStore + UserStore {}

impl<T: GoalStore + UserStore> Store for T {}
