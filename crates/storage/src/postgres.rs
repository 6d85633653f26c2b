//! PostgreSQL store backed by an `sqlx` connection pool.
//!
//! Counter updates are single `UPDATE` statements; checkpoints lock the
//! goal row with `SELECT ... FOR UPDATE` so a concurrent increment waits
//! for the reset to commit.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use doordont_core::config::PostgresConfig;
use doordont_core::{normalize_twitter_handle, Goal, GoalId, GoalMode, NewGoal, User, UserId};

use crate::error::{StoreError, StoreResult};
use crate::password::{generate_salt, hash_password, verify_password};
use crate::traits::{GoalStore, UserStore};

const GOAL_COLUMNS: &str =
    "goals.id, goals.description, goals.punishment, goals.initiate, goals.frequency, goals.counter, goals.user_id";

#[derive(Debug, sqlx::FromRow)]
struct GoalRow {
    id: i64,
    description: String,
    punishment: String,
    initiate: bool,
    frequency: i32,
    counter: i32,
    user_id: i64,
}

impl TryFrom<GoalRow> for Goal {
    type Error = StoreError;

    fn try_from(row: GoalRow) -> Result<Self, Self::Error> {
        let frequency = u32::try_from(row.frequency)
            .map_err(|_| StoreError::Storage(format!("goal {} has negative frequency", row.id)))?;
        let counter = u32::try_from(row.counter)
            .map_err(|_| StoreError::Storage(format!("goal {} has negative counter", row.id)))?;
        Ok(Goal {
            id: row.id,
            description: row.description,
            punishment: row.punishment.parse()?,
            mode: GoalMode::from_initiate(row.initiate),
            frequency,
            counter,
            user_id: row.user_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    salt: String,
    twitter: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password,
            salt: row.salt,
            twitter: row.twitter,
        }
    }
}

fn to_goals(rows: Vec<GoalRow>) -> StoreResult<Vec<Goal>> {
    rows.into_iter().map(Goal::try_from).collect()
}

fn expect_affected(id: GoalId, rows_affected: u64) -> StoreResult<()> {
    if rows_affected == 0 {
        Err(StoreError::NotFound(id))
    } else {
        Ok(())
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to PostgreSQL and apply pending migrations.
    pub async fn connect(config: &PostgresConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url())
            .await?;
        info!("PostgreSQL connected: {}", config.host);

        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("Database migrations applied successfully");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl GoalStore for PgStore {
    async fn insert_goal(&self, goal: NewGoal) -> StoreResult<GoalId> {
        goal.validate()?;
        let frequency = i32::try_from(goal.frequency)
            .map_err(|_| StoreError::InvalidGoal("frequency is too large".to_string()))?;

        let id: Option<i64> = sqlx::query_scalar(
            r#"INSERT INTO goals (description, punishment, initiate, frequency, counter, user_id)
               SELECT $1, $2, $3, $4, 0, users.id FROM users WHERE users.username = $5
               RETURNING id"#,
        )
        .bind(&goal.description)
        .bind(goal.punishment.channel_name())
        .bind(goal.mode.is_initiate())
        .bind(frequency)
        .bind(&goal.username)
        .fetch_optional(&self.pool)
        .await?;

        id.ok_or(StoreError::UnknownUser(goal.username))
    }

    async fn get_goal(&self, id: GoalId) -> StoreResult<Goal> {
        let row = sqlx::query_as::<_, GoalRow>(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE goals.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;
        row.try_into()
    }

    async fn list_goals_for_user(&self, username: &str) -> StoreResult<Vec<Goal>> {
        let rows = sqlx::query_as::<_, GoalRow>(&format!(
            r#"SELECT {GOAL_COLUMNS} FROM goals
               INNER JOIN users ON users.id = goals.user_id
               WHERE users.username = $1
               ORDER BY goals.id"#
        ))
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            // Distinguish "no goals yet" from "no such user".
            self.get_user(username).await?;
        }
        to_goals(rows)
    }

    async fn list_goals(&self) -> StoreResult<Vec<Goal>> {
        let rows = sqlx::query_as::<_, GoalRow>(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals ORDER BY goals.id"
        ))
        .fetch_all(&self.pool)
        .await?;
        to_goals(rows)
    }

    async fn increment_counter(&self, id: GoalId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE goals SET counter = counter + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(id, result.rows_affected())
    }

    async fn reset_counter(&self, id: GoalId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE goals SET counter = 0 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(id, result.rows_affected())
    }

    async fn delete_goal(&self, id: GoalId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(id, result.rows_affected())
    }

    async fn checkpoint_goal(&self, id: GoalId, reset: bool) -> StoreResult<Goal> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, GoalRow>(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE goals.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        if reset {
            sqlx::query("UPDATE goals SET counter = 0 WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        row.try_into()
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, username: &str, password: &str) -> StoreResult<UserId> {
        let salt = generate_salt();
        let hash = hash_password(password, &salt);

        let result = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, password, salt) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind(&hash)
        .bind(&salt)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => Ok(id),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateUsername(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn verify_user(&self, username: &str, password: &str) -> StoreResult<bool> {
        match self.get_user(username).await {
            Ok(user) => Ok(verify_password(password, &user.salt, &user.password_hash)),
            Err(StoreError::UnknownUser(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self, username: &str) -> StoreResult<User> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, salt, twitter FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::from)
        .ok_or_else(|| StoreError::UnknownUser(username.to_string()))
    }

    async fn get_user_by_id(&self, id: UserId) -> StoreResult<User> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, salt, twitter FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::from)
        .ok_or_else(|| StoreError::UnknownUser(format!("#{id}")))
    }

    async fn set_twitter_handle(&self, username: &str, handle: Option<&str>) -> StoreResult<()> {
        let handle = handle.and_then(normalize_twitter_handle);
        let result = sqlx::query("UPDATE users SET twitter = $1 WHERE username = $2")
            .bind(handle)
            .bind(username)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownUser(username.to_string()));
        }
        Ok(())
    }

    async fn get_twitter_handle(&self, username: &str) -> StoreResult<Option<String>> {
        Ok(self.get_user(username).await?.twitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doordont_core::Punishment;

    fn row(frequency: i32, counter: i32, punishment: &str) -> GoalRow {
        GoalRow {
            id: 3,
            description: "stretch".to_string(),
            punishment: punishment.to_string(),
            initiate: false,
            frequency,
            counter,
            user_id: 1,
        }
    }

    #[test]
    fn goal_row_maps_initiate_to_mode() {
        let goal = Goal::try_from(row(3, 1, "tweet")).unwrap();
        assert_eq!(goal.mode, GoalMode::Quit);
        assert_eq!(goal.punishment, Punishment::Tweet);
        assert_eq!(goal.frequency, 3);
        assert_eq!(goal.counter, 1);
    }

    #[test]
    fn goal_row_rejects_negative_counter() {
        let err = Goal::try_from(row(3, -1, "email")).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }

    #[test]
    fn goal_row_rejects_unknown_punishment() {
        let err = Goal::try_from(row(3, 0, "fax")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidGoal(_)));
    }

    #[test]
    fn zero_rows_affected_is_not_found() {
        assert!(matches!(expect_affected(5, 0), Err(StoreError::NotFound(5))));
        assert!(expect_affected(5, 1).is_ok());
    }
}
