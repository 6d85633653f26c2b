//! In-process store used for development and tests.
//!
//! Each goal lives behind its own mutex so counter updates on one goal
//! never wait on another. The outer maps are only write-locked to insert
//! or remove entries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use doordont_core::{normalize_twitter_handle, Goal, GoalId, NewGoal, User, UserId};

use crate::error::{StoreError, StoreResult};
use crate::password::{generate_salt, hash_password, verify_password};
use crate::traits::{GoalStore, UserStore};

type GoalSlot = Arc<Mutex<Goal>>;

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Storage("memory store lock poisoned".to_string())
}

pub struct MemoryStore {
    next_goal_id: AtomicI64,
    next_user_id: AtomicI64,
    goals: RwLock<HashMap<GoalId, GoalSlot>>,
    /// Username → user.
    users: RwLock<HashMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_goal_id: AtomicI64::new(1),
            next_user_id: AtomicI64::new(1),
            goals: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
        }
    }

    fn goal_slot(&self, id: GoalId) -> StoreResult<GoalSlot> {
        let goals = self.goals.read().map_err(poisoned)?;
        goals.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn user_id(&self, username: &str) -> StoreResult<UserId> {
        let users = self.users.read().map_err(poisoned)?;
        users
            .get(username)
            .map(|u| u.id)
            .ok_or_else(|| StoreError::UnknownUser(username.to_string()))
    }

    fn snapshot_goals(&self, filter: impl Fn(&Goal) -> bool) -> StoreResult<Vec<Goal>> {
        let slots: Vec<GoalSlot> = {
            let goals = self.goals.read().map_err(poisoned)?;
            goals.values().cloned().collect()
        };
        let mut out = Vec::with_capacity(slots.len());
        for slot in slots {
            let goal = slot.lock().map_err(poisoned)?;
            if filter(&goal) {
                out.push(goal.clone());
            }
        }
        out.sort_by_key(|g| g.id);
        Ok(out)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GoalStore for MemoryStore {
    async fn insert_goal(&self, goal: NewGoal) -> StoreResult<GoalId> {
        goal.validate()?;
        let user_id = self.user_id(&goal.username)?;
        let id = self.next_goal_id.fetch_add(1, Ordering::SeqCst);
        let record = Goal {
            id,
            description: goal.description,
            punishment: goal.punishment,
            mode: goal.mode,
            frequency: goal.frequency,
            counter: 0,
            user_id,
        };
        self.goals
            .write()
            .map_err(poisoned)?
            .insert(id, Arc::new(Mutex::new(record)));
        Ok(id)
    }

    async fn get_goal(&self, id: GoalId) -> StoreResult<Goal> {
        let slot = self.goal_slot(id)?;
        let goal = slot.lock().map_err(poisoned)?;
        Ok(goal.clone())
    }

    async fn list_goals_for_user(&self, username: &str) -> StoreResult<Vec<Goal>> {
        let user_id = self.user_id(username)?;
        self.snapshot_goals(|g| g.user_id == user_id)
    }

    async fn list_goals(&self) -> StoreResult<Vec<Goal>> {
        self.snapshot_goals(|_| true)
    }

    async fn increment_counter(&self, id: GoalId) -> StoreResult<()> {
        let slot = self.goal_slot(id)?;
        let mut goal = slot.lock().map_err(poisoned)?;
        goal.counter = goal
            .counter
            .checked_add(1)
            .ok_or_else(|| StoreError::Storage(format!("counter overflow for goal {id}")))?;
        Ok(())
    }

    async fn reset_counter(&self, id: GoalId) -> StoreResult<()> {
        let slot = self.goal_slot(id)?;
        let mut goal = slot.lock().map_err(poisoned)?;
        goal.counter = 0;
        Ok(())
    }

    async fn delete_goal(&self, id: GoalId) -> StoreResult<()> {
        let mut goals = self.goals.write().map_err(poisoned)?;
        goals.remove(&id).map(|_| ()).ok_or(StoreError::NotFound(id))
    }

    async fn checkpoint_goal(&self, id: GoalId, reset: bool) -> StoreResult<Goal> {
        let slot = self.goal_slot(id)?;
        let mut goal = slot.lock().map_err(poisoned)?;
        let snapshot = goal.clone();
        if reset {
            goal.counter = 0;
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, username: &str, password: &str) -> StoreResult<UserId> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.contains_key(username) {
            return Err(StoreError::DuplicateUsername(username.to_string()));
        }
        let salt = generate_salt();
        let id = self.next_user_id.fetch_add(1, Ordering::SeqCst);
        users.insert(
            username.to_string(),
            User {
                id,
                username: username.to_string(),
                password_hash: hash_password(password, &salt),
                salt,
                twitter: None,
            },
        );
        Ok(id)
    }

    async fn verify_user(&self, username: &str, password: &str) -> StoreResult<bool> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users
            .get(username)
            .map(|u| verify_password(password, &u.salt, &u.password_hash))
            .unwrap_or(false))
    }

    async fn get_user(&self, username: &str) -> StoreResult<User> {
        let users = self.users.read().map_err(poisoned)?;
        users
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::UnknownUser(username.to_string()))
    }

    async fn get_user_by_id(&self, id: UserId) -> StoreResult<User> {
        let users = self.users.read().map_err(poisoned)?;
        users
            .values()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownUser(format!("#{id}")))
    }

    async fn set_twitter_handle(&self, username: &str, handle: Option<&str>) -> StoreResult<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        let user = users
            .get_mut(username)
            .ok_or_else(|| StoreError::UnknownUser(username.to_string()))?;
        user.twitter = handle.and_then(normalize_twitter_handle);
        Ok(())
    }

    async fn get_twitter_handle(&self, username: &str) -> StoreResult<Option<String>> {
        Ok(self.get_user(username).await?.twitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doordont_core::{GoalMode, Punishment};

    async fn store_with_user() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_user("jon@example.com", "pw").await.unwrap();
        store
    }

    fn new_goal(mode: GoalMode, frequency: u32) -> NewGoal {
        NewGoal {
            description: "go running".to_string(),
            punishment: Punishment::Email,
            mode,
            frequency,
            username: "jon@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_goal_starts_counter_at_zero() {
        let store = store_with_user().await;
        let id = store.insert_goal(new_goal(GoalMode::Start, 4)).await.unwrap();
        let goal = store.get_goal(id).await.unwrap();
        assert_eq!(goal.counter, 0);
        assert_eq!(goal.frequency, 4);
        assert_eq!(goal.mode, GoalMode::Start);
    }

    #[tokio::test]
    async fn insert_goal_for_unknown_user_fails() {
        let store = MemoryStore::new();
        let err = store.insert_goal(new_goal(GoalMode::Start, 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownUser(_)));
    }

    #[tokio::test]
    async fn insert_goal_rejects_zero_frequency() {
        let store = store_with_user().await;
        let err = store.insert_goal(new_goal(GoalMode::Quit, 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidGoal(_)));
    }

    #[tokio::test]
    async fn increments_then_reset_yield_zero() {
        let store = store_with_user().await;
        let id = store.insert_goal(new_goal(GoalMode::Start, 3)).await.unwrap();
        for n in [0usize, 1, 5, 17] {
            for _ in 0..n {
                store.increment_counter(id).await.unwrap();
            }
            assert_eq!(store.get_goal(id).await.unwrap().counter, n as u32);
            store.reset_counter(id).await.unwrap();
            assert_eq!(store.get_goal(id).await.unwrap().counter, 0);
        }
    }

    #[tokio::test]
    async fn increment_at_max_counter_is_an_error() {
        let store = store_with_user().await;
        let id = store.insert_goal(new_goal(GoalMode::Start, 3)).await.unwrap();
        store.goal_slot(id).unwrap().lock().unwrap().counter = u32::MAX;

        let err = store.increment_counter(id).await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(store.get_goal(id).await.unwrap().counter, u32::MAX);
    }

    #[tokio::test]
    async fn missing_goal_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.get_goal(99).await, Err(StoreError::NotFound(99))));
        assert!(matches!(store.increment_counter(99).await, Err(StoreError::NotFound(99))));
        assert!(matches!(store.reset_counter(99).await, Err(StoreError::NotFound(99))));
        assert!(matches!(store.delete_goal(99).await, Err(StoreError::NotFound(99))));
    }

    #[tokio::test]
    async fn delete_removes_goal() {
        let store = store_with_user().await;
        let id = store.insert_goal(new_goal(GoalMode::Start, 3)).await.unwrap();
        store.delete_goal(id).await.unwrap();
        assert!(matches!(store.get_goal(id).await, Err(StoreError::NotFound(_))));
        assert!(store.list_goals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_goals_for_user_filters_by_owner() {
        let store = store_with_user().await;
        store.insert_user("ann@example.com", "pw").await.unwrap();
        let a = store.insert_goal(new_goal(GoalMode::Start, 3)).await.unwrap();
        let mut other = new_goal(GoalMode::Quit, 2);
        other.username = "ann@example.com".to_string();
        let b = store.insert_goal(other).await.unwrap();

        let jon: Vec<GoalId> = store
            .list_goals_for_user("jon@example.com")
            .await
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(jon, vec![a]);

        let all: Vec<GoalId> = store.list_goals().await.unwrap().iter().map(|g| g.id).collect();
        assert_eq!(all, vec![a, b]);
    }

    #[tokio::test]
    async fn checkpoint_returns_pre_reset_counter() {
        let store = store_with_user().await;
        let id = store.insert_goal(new_goal(GoalMode::Start, 3)).await.unwrap();
        store.increment_counter(id).await.unwrap();
        store.increment_counter(id).await.unwrap();

        let kept = store.checkpoint_goal(id, false).await.unwrap();
        assert_eq!(kept.counter, 2);
        assert_eq!(store.get_goal(id).await.unwrap().counter, 2);

        let reset = store.checkpoint_goal(id, true).await.unwrap();
        assert_eq!(reset.counter, 2);
        assert_eq!(store.get_goal(id).await.unwrap().counter, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_and_checkpoints_lose_nothing() {
        let store = Arc::new(store_with_user().await);
        let id = store.insert_goal(new_goal(GoalMode::Start, 3)).await.unwrap();

        let increments = 200usize;
        let mut tasks = Vec::new();
        for _ in 0..increments {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.increment_counter(id).await.unwrap();
                0u32
            }));
        }
        for _ in 0..20 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.checkpoint_goal(id, true).await.unwrap().counter
            }));
        }

        let drained: u32 = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .sum();
        let remaining = store.get_goal(id).await.unwrap().counter;

        // Every increment is observed by exactly one checkpoint or is still pending.
        assert_eq!(drained + remaining, increments as u32);
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let store = store_with_user().await;
        let err = store.insert_user("jon@example.com", "other").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(_)));
    }

    #[tokio::test]
    async fn verify_user_checks_password() {
        let store = store_with_user().await;
        assert!(store.verify_user("jon@example.com", "pw").await.unwrap());
        assert!(!store.verify_user("jon@example.com", "nope").await.unwrap());
        assert!(!store.verify_user("nobody@example.com", "pw").await.unwrap());
    }

    #[tokio::test]
    async fn twitter_handle_round_trip() {
        let store = store_with_user().await;
        assert_eq!(store.get_twitter_handle("jon@example.com").await.unwrap(), None);

        store
            .set_twitter_handle("jon@example.com", Some("@jon"))
            .await
            .unwrap();
        assert_eq!(
            store.get_twitter_handle("jon@example.com").await.unwrap(),
            Some("jon".to_string())
        );

        let user = store.get_user("jon@example.com").await.unwrap();
        let by_id = store.get_user_by_id(user.id).await.unwrap();
        assert_eq!(by_id.twitter.as_deref(), Some("jon"));

        let err = store.set_twitter_handle("ghost", Some("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownUser(_)));
    }
}
