//! Goals, the completion rule, and failure messages.
//!
//! A goal either asks the owner to *start* doing something at least
//! `frequency` times per period, or to *quit* it, doing it fewer than
//! `frequency` times. The counter accumulates reported occurrences until
//! it is reset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::user::UserId;

pub type GoalId = i64;

/// Subject line used for every failure notification.
pub const FAILURE_SUBJECT: &str = "Goal update";

// ── Punishment ──────────────────────────────────────────────────

/// How the owner is told that a goal was missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Punishment {
    Email,
    Tweet,
}

impl Punishment {
    /// Notification channel name this punishment is delivered through.
    pub fn channel_name(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Tweet => "tweet",
        }
    }
}

impl fmt::Display for Punishment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.channel_name())
    }
}

impl FromStr for Punishment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "tweet" => Ok(Self::Tweet),
            other => Err(CoreError::UnknownPunishment(other.to_string())),
        }
    }
}

// ── Mode ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalMode {
    /// Do the activity at least `frequency` times.
    Start,
    /// Do the activity fewer than `frequency` times.
    Quit,
}

impl GoalMode {
    /// Map the persisted `initiate` flag (true = start) to a mode.
    pub fn from_initiate(initiate: bool) -> Self {
        if initiate {
            Self::Start
        } else {
            Self::Quit
        }
    }

    pub fn is_initiate(&self) -> bool {
        matches!(self, Self::Start)
    }
}

// ── Completion rule ─────────────────────────────────────────────

/// Whether `counter` occurrences satisfy a goal of the given mode and frequency.
///
/// Reaching the frequency exactly meets a start goal and fails a quit goal.
pub fn evaluate(mode: GoalMode, frequency: u32, counter: u32) -> bool {
    let reached = counter >= frequency;
    match mode {
        GoalMode::Start => reached,
        GoalMode::Quit => !reached,
    }
}

/// Body of the notification sent when a goal was missed.
pub fn failure_message(mode: GoalMode, description: &str, frequency: u32, counter: u32) -> String {
    match mode {
        GoalMode::Start => format!(
            "You promised to \"{description}\" at least {frequency} times, but you only did it {counter} times!"
        ),
        GoalMode::Quit => format!(
            "You promised to \"{description}\" less than {frequency} times, but you did it {counter} times!"
        ),
    }
}

// ── Goal ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub description: String,
    pub punishment: Punishment,
    pub mode: GoalMode,
    pub frequency: u32,
    pub counter: u32,
    pub user_id: UserId,
}

impl Goal {
    pub fn met_goal(&self) -> bool {
        evaluate(self.mode, self.frequency, self.counter)
    }

    pub fn verdict(&self) -> Verdict {
        Verdict {
            goal_id: self.id,
            met_goal: self.met_goal(),
            mode: self.mode,
            frequency: self.frequency,
            counter: self.counter,
            description: self.description.clone(),
        }
    }
}

/// A goal as submitted by its owner, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGoal {
    pub description: String,
    pub punishment: Punishment,
    pub mode: GoalMode,
    pub frequency: u32,
    /// Username of the owner.
    pub username: String,
}

impl NewGoal {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.description.trim().is_empty() {
            return Err(CoreError::InvalidGoal("description must not be empty".to_string()));
        }
        if self.frequency == 0 {
            return Err(CoreError::InvalidGoal("frequency must be at least 1".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(CoreError::InvalidGoal("username must not be empty".to_string()));
        }
        Ok(())
    }
}

// ── Verdict ─────────────────────────────────────────────────────

/// Outcome of evaluating one goal, with enough context to explain it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub goal_id: GoalId,
    pub met_goal: bool,
    pub mode: GoalMode,
    pub frequency: u32,
    pub counter: u32,
    pub description: String,
}

impl Verdict {
    /// The failure message, or `None` when the goal was met.
    pub fn failure_message(&self) -> Option<String> {
        if self.met_goal {
            return None;
        }
        Some(failure_message(
            self.mode,
            &self.description,
            self.frequency,
            self.counter,
        ))
    }
}
