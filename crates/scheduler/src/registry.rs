//! Registry of per-goal evaluation tasks.
//!
//! Every scheduled goal gets its own tokio task that sleeps until the next
//! fire of the shared [`Cadence`] and then runs the [`EvaluationJob`]. Fires
//! for one goal never overlap: the task and manual runs share a per-goal gate,
//! and cancelling waits on that gate. A task whose goal has disappeared
//! removes its own registry entry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Local;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use doordont_core::GoalId;
use doordont_storage::{GoalStore, StoreResult};

use crate::cadence::Cadence;
use crate::job::{EvaluationJob, FireOutcome};

struct JobHandle {
    /// Distinguishes a job from the one that replaced it.
    generation: u64,
    shutdown: Arc<Notify>,
    /// Held for the duration of each fire.
    gate: Arc<Mutex<()>>,
    handle: JoinHandle<()>,
}

type Registry = Arc<Mutex<HashMap<GoalId, JobHandle>>>;

pub struct GoalScheduler {
    job: Arc<EvaluationJob>,
    cadence: Cadence,
    jobs: Registry,
    next_generation: AtomicU64,
}

impl GoalScheduler {
    pub fn new(job: EvaluationJob, cadence: Cadence) -> Self {
        Self {
            job: Arc::new(job),
            cadence,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    /// Start evaluating `goal_id` on the cadence, replacing any existing job.
    pub async fn schedule(&self, goal_id: GoalId) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let shutdown = Arc::new(Notify::new());

        let mut jobs = self.jobs.lock().await;
        let gate = jobs
            .get(&goal_id)
            .map(|existing| existing.gate.clone())
            .unwrap_or_default();

        let handle = tokio::spawn(run_goal_loop(GoalLoop {
            goal_id,
            generation,
            cadence: self.cadence.clone(),
            job: self.job.clone(),
            shutdown: shutdown.clone(),
            gate: gate.clone(),
            jobs: self.jobs.clone(),
        }));

        let replaced = jobs.insert(
            goal_id,
            JobHandle {
                generation,
                shutdown,
                gate,
                handle,
            },
        );
        if let Some(previous) = replaced {
            previous.shutdown.notify_one();
            debug!(goal_id, "Replaced existing evaluation job");
        }

        info!(goal_id, cadence = %self.cadence, "Goal scheduled");
    }

    /// Stop evaluating `goal_id`. Returns `false` if it was not scheduled.
    ///
    /// Waits for a fire already in progress to complete; no further fires
    /// start once this returns.
    pub async fn cancel(&self, goal_id: GoalId) -> bool {
        let removed = self.jobs.lock().await.remove(&goal_id);
        let Some(job) = removed else {
            return false;
        };
        job.shutdown.notify_one();
        drop(job.gate.lock().await);
        info!(goal_id, "Goal unscheduled");
        true
    }

    pub async fn is_scheduled(&self, goal_id: GoalId) -> bool {
        self.jobs.lock().await.contains_key(&goal_id)
    }

    /// Ids of all scheduled goals, ascending.
    pub async fn scheduled_ids(&self) -> Vec<GoalId> {
        let mut ids: Vec<GoalId> = self.jobs.lock().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Schedule every persisted goal. Used at startup.
    pub async fn restore(&self) -> StoreResult<usize> {
        let goals = self.job.store().list_goals().await?;
        for goal in &goals {
            self.schedule(goal.id).await;
        }
        info!(count = goals.len(), "Evaluation jobs restored");
        Ok(goals.len())
    }

    /// Evaluate `goal_id` immediately, outside the cadence.
    ///
    /// Waits for an in-flight scheduled fire of the same goal to finish.
    pub async fn run_now(&self, goal_id: GoalId) -> FireOutcome {
        let gate = self
            .jobs
            .lock()
            .await
            .get(&goal_id)
            .map(|job| job.gate.clone());

        let outcome = match gate {
            Some(gate) => {
                let _guard = gate.lock().await;
                self.job.fire(goal_id).await
            }
            None => self.job.fire(goal_id).await,
        };

        if matches!(outcome, FireOutcome::GoalMissing) {
            self.cancel(goal_id).await;
        }
        outcome
    }

    /// Stop all jobs and wait for their tasks to exit.
    pub async fn shutdown(&self) {
        let jobs: Vec<JobHandle> = self.jobs.lock().await.drain().map(|(_, job)| job).collect();
        let count = jobs.len();

        for job in &jobs {
            job.shutdown.notify_one();
        }
        for job in jobs {
            if let Err(e) = job.handle.await {
                warn!(error = %e, "Evaluation job ended abnormally");
            }
        }
        info!(count, "Scheduler stopped");
    }
}

struct GoalLoop {
    goal_id: GoalId,
    generation: u64,
    cadence: Cadence,
    job: Arc<EvaluationJob>,
    shutdown: Arc<Notify>,
    gate: Arc<Mutex<()>>,
    jobs: Registry,
}

impl GoalLoop {
    async fn is_current(&self) -> bool {
        self.jobs
            .lock()
            .await
            .get(&self.goal_id)
            .is_some_and(|job| job.generation == self.generation)
    }

    async fn deregister(&self) {
        let mut jobs = self.jobs.lock().await;
        if jobs
            .get(&self.goal_id)
            .is_some_and(|job| job.generation == self.generation)
        {
            jobs.remove(&self.goal_id);
        }
    }
}

async fn run_goal_loop(ctx: GoalLoop) {
    let goal_id = ctx.goal_id;
    let mut previous = None;
    loop {
        let Some((at, delay)) = ctx.cadence.next_fire(Local::now(), previous) else {
            warn!(goal_id, cadence = %ctx.cadence, "Cadence has no further fire times");
            ctx.deregister().await;
            break;
        };

        tokio::select! {
            _ = ctx.shutdown.notified() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        previous = Some(at);

        let outcome = {
            let _guard = ctx.gate.lock().await;
            if !ctx.is_current().await {
                break;
            }
            ctx.job.fire(goal_id).await
        };

        if matches!(outcome, FireOutcome::GoalMissing) {
            ctx.deregister().await;
            break;
        }
    }
    debug!(goal_id, "Evaluation job stopped");
}
