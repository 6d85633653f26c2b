//! A single evaluation fire for one goal.
//!
//! 1. Read the goal and resolve where a punishment would go
//! 2. Checkpoint it (read again, optionally resetting the counter atomically)
//! 3. Evaluate the checkpointed goal and dispatch the punishment on failure
//!
//! Every store read happens before the checkpoint, so a store error never
//! leaves a reset counter behind without a verdict. Delivery errors are
//! reported, never retried.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use doordont_core::{Goal, GoalId, Punishment, Verdict, FAILURE_SUBJECT};
use doordont_notify::{DispatchResult, Dispatcher, Notification};
use doordont_storage::{GoalStore, Store, StoreError, UserStore};

/// Where a failure notification is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub channel: String,
    pub recipient: String,
}

/// Result of one fire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FireOutcome {
    /// Goal met; nothing sent.
    Met { verdict: Verdict },
    /// Goal missed and the punishment was delivered.
    Notified {
        verdict: Verdict,
        delivery: DispatchResult,
    },
    /// Goal missed but the punishment could not be delivered.
    DeliveryFailed { verdict: Verdict, error: String },
    /// The goal no longer exists.
    GoalMissing,
    /// A store error stopped this fire before a verdict.
    Aborted { error: String },
}

impl FireOutcome {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            Self::Met { verdict }
            | Self::Notified { verdict, .. }
            | Self::DeliveryFailed { verdict, .. } => Some(verdict),
            Self::GoalMissing | Self::Aborted { .. } => None,
        }
    }
}

pub struct EvaluationJob {
    store: Arc<dyn Store>,
    dispatcher: Dispatcher,
    /// Reset the counter in the same step as the evaluation read.
    reset_after_evaluation: bool,
}

impl EvaluationJob {
    pub fn new(store: Arc<dyn Store>, dispatcher: Dispatcher, reset_after_evaluation: bool) -> Self {
        Self {
            store,
            dispatcher,
            reset_after_evaluation,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Evaluate `goal_id` once.
    pub async fn fire(&self, goal_id: GoalId) -> FireOutcome {
        let goal = match self.store.get_goal(goal_id).await {
            Ok(goal) => goal,
            Err(e) => return store_failure(goal_id, e, "goal read failed"),
        };

        let delivery = match self.resolve_delivery(&goal).await {
            Ok(delivery) => delivery,
            Err(e) => return store_failure(goal_id, e, "owner lookup failed"),
        };

        let goal = match self
            .store
            .checkpoint_goal(goal_id, self.reset_after_evaluation)
            .await
        {
            Ok(goal) => goal,
            Err(e) => return store_failure(goal_id, e, "checkpoint failed"),
        };

        let verdict = goal.verdict();
        let Some(message) = verdict.failure_message() else {
            debug!(
                goal_id,
                counter = verdict.counter,
                frequency = verdict.frequency,
                "Goal met"
            );
            return FireOutcome::Met { verdict };
        };

        info!(
            goal_id,
            counter = verdict.counter,
            frequency = verdict.frequency,
            channel = %delivery.channel,
            "Goal missed, sending punishment"
        );

        let notification = Notification::new(&delivery.recipient, FAILURE_SUBJECT, message)
            .with_metadata("goal_id", goal_id.to_string())
            .with_metadata("punishment", goal.punishment.channel_name());

        match self
            .dispatcher
            .dispatch(&delivery.channel, &notification)
            .await
        {
            Some(result) if result.success => FireOutcome::Notified {
                verdict,
                delivery: result,
            },
            Some(result) => FireOutcome::DeliveryFailed {
                verdict,
                error: result
                    .error
                    .unwrap_or_else(|| "delivery failed".to_string()),
            },
            None => FireOutcome::DeliveryFailed {
                verdict,
                error: format!("no '{}' channel configured", delivery.channel),
            },
        }
    }

    /// Tweet punishments go to the owner's handle when the relay is
    /// configured; everything else is emailed to the owner's username.
    async fn resolve_delivery(&self, goal: &Goal) -> Result<Delivery, StoreError> {
        let owner = self.store.get_user_by_id(goal.user_id).await?;

        if goal.punishment == Punishment::Tweet && self.dispatcher.has_channel("tweet") {
            if let Some(handle) = owner.twitter {
                return Ok(Delivery {
                    channel: Punishment::Tweet.channel_name().to_string(),
                    recipient: handle,
                });
            }
        }

        Ok(Delivery {
            channel: Punishment::Email.channel_name().to_string(),
            recipient: owner.username,
        })
    }
}

fn store_failure(goal_id: GoalId, error: StoreError, step: &str) -> FireOutcome {
    if let StoreError::NotFound(_) = error {
        info!(goal_id, "Goal no longer exists");
        return FireOutcome::GoalMissing;
    }
    warn!(goal_id, error = %error, step, "Goal evaluation aborted: store error");
    FireOutcome::Aborted {
        error: error.to_string(),
    }
}
