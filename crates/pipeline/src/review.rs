//! AI review task queue.
//!
//! Submissions go through a bounded channel to a fixed pool of workers.
//! Every task gets an id and an observable [`ReviewTaskState`], so callers
//! and tests can follow a review from submission to completion without
//! reaching into globals.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use salesagent_core::approval::{status_for_review, ReviewDecision};
use salesagent_core::creative::STATUS_PENDING;
use salesagent_db::repositories::CreativeRepo;
use salesagent_db::DbPool;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::ReviewConfig;
use crate::notify::Notifier;
use crate::reviewer::{CreativeReviewer, ReviewRequest};

/// Key under `data` where the review outcome is recorded.
pub const DATA_AI_REVIEW: &str = "ai_review";

/// Result of a finished review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOutcome {
    pub decision: ReviewDecision,
    pub confidence: f64,
    pub reason: String,
    /// Status written to the creative.
    pub status: String,
    /// False when the creative had left `pending` before the review landed.
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReviewTaskState {
    Queued,
    Running,
    Completed(ReviewOutcome),
    Failed { message: String },
}

impl ReviewTaskState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewQueueError {
    #[error("Review queue is shut down")]
    Closed,
}

/// Task states by id. Finished tasks are kept up to a limit, oldest
/// evicted first; queued and running tasks are never evicted.
struct TaskTable {
    states: HashMap<Uuid, ReviewTaskState>,
    finished: VecDeque<Uuid>,
    retain_finished: usize,
}

impl TaskTable {
    fn new(retain_finished: usize) -> Self {
        Self {
            states: HashMap::new(),
            finished: VecDeque::new(),
            retain_finished,
        }
    }

    fn set(&mut self, id: Uuid, state: ReviewTaskState) {
        let finished = state.is_finished();
        self.states.insert(id, state);
        if !finished {
            return;
        }
        self.finished.push_back(id);
        while self.finished.len() > self.retain_finished {
            if let Some(evicted) = self.finished.pop_front() {
                self.states.remove(&evicted);
            }
        }
    }

    fn remove(&mut self, id: &Uuid) {
        self.states.remove(id);
    }
}

type TaskMap = Arc<RwLock<TaskTable>>;

struct ReviewJob {
    id: Uuid,
    request: ReviewRequest,
}

/// Handle for submitting review tasks. Cheap to clone.
#[derive(Clone)]
pub struct ReviewQueue {
    sender: mpsc::Sender<ReviewJob>,
    tasks: TaskMap,
}

/// Shared by all workers.
struct WorkerContext {
    pool: DbPool,
    reviewer: Arc<dyn CreativeReviewer>,
    notifier: Notifier,
    tasks: TaskMap,
    receiver: Mutex<mpsc::Receiver<ReviewJob>>,
}

impl ReviewQueue {
    /// Spawn `config.workers` workers. They stop when `cancel` fires or
    /// every queue handle is dropped.
    pub fn start(
        pool: DbPool,
        reviewer: Arc<dyn CreativeReviewer>,
        notifier: Notifier,
        config: &ReviewConfig,
        cancel: CancellationToken,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let tasks: TaskMap = Arc::new(RwLock::new(TaskTable::new(config.retain_finished)));
        let ctx = Arc::new(WorkerContext {
            pool,
            reviewer,
            notifier,
            tasks: tasks.clone(),
            receiver: Mutex::new(receiver),
        });

        let handles = (0..config.workers.max(1))
            .map(|worker| tokio::spawn(run_worker(worker, ctx.clone(), cancel.clone())))
            .collect();

        tracing::info!(workers = config.workers.max(1), "AI review queue started");
        (Self { sender, tasks }, handles)
    }

    /// Queue a review. Waits when the channel is full.
    pub async fn submit(&self, request: ReviewRequest) -> Result<Uuid, ReviewQueueError> {
        let id = Uuid::new_v4();
        self.tasks.write().await.set(id, ReviewTaskState::Queued);
        let creative_id = request.creative.creative_id.clone();
        if self.sender.send(ReviewJob { id, request }).await.is_err() {
            self.tasks.write().await.remove(&id);
            return Err(ReviewQueueError::Closed);
        }
        tracing::debug!(task_id = %id, creative_id, "AI review queued");
        Ok(id)
    }

    pub async fn state(&self, id: Uuid) -> Option<ReviewTaskState> {
        self.tasks.read().await.states.get(&id).cloned()
    }

    /// Snapshot of every live task and the most recently finished ones.
    pub async fn states(&self) -> HashMap<Uuid, ReviewTaskState> {
        self.tasks.read().await.states.clone()
    }
}

async fn run_worker(worker: usize, ctx: Arc<WorkerContext>, cancel: CancellationToken) {
    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => break,
            job = async { ctx.receiver.lock().await.recv().await } => job,
        };
        let Some(job) = job else {
            break;
        };

        set_state(&ctx.tasks, job.id, ReviewTaskState::Running).await;
        let state = match process(&ctx, &job.request).await {
            Ok(outcome) => ReviewTaskState::Completed(outcome),
            Err(message) => {
                tracing::error!(
                    task_id = %job.id,
                    creative_id = %job.request.creative.creative_id,
                    error = %message,
                    "AI review failed, leaving creative for a human"
                );
                ctx.notifier
                    .creative_pending(job.request.webhook_url.as_deref(), &job.request.creative);
                ReviewTaskState::Failed { message }
            }
        };
        set_state(&ctx.tasks, job.id, state).await;
    }
    tracing::debug!(worker, "AI review worker stopped");
}

async fn process(ctx: &WorkerContext, request: &ReviewRequest) -> Result<ReviewOutcome, String> {
    let verdict = ctx
        .reviewer
        .review(request)
        .await
        .map_err(|e| e.to_string())?;

    let status = status_for_review(verdict.decision, verdict.confidence).unwrap_or(STATUS_PENDING);
    let patch = json!({
        DATA_AI_REVIEW: {
            "decision": verdict.decision,
            "confidence": verdict.confidence,
            "reason": verdict.reason,
            "reviewed_at": chrono::Utc::now(),
        }
    });
    let applied = CreativeRepo::apply_review(&ctx.pool, request.creative.id, status, &patch)
        .await
        .map_err(|e| e.to_string())?
        .is_some();

    tracing::info!(
        creative_id = %request.creative.creative_id,
        decision = ?verdict.decision,
        confidence = verdict.confidence,
        status,
        applied,
        "AI review completed"
    );
    if applied {
        ctx.notifier.creative_reviewed(
            request.webhook_url.as_deref(),
            &request.creative,
            verdict.decision,
            verdict.confidence,
            status,
            &verdict.reason,
        );
    }

    Ok(ReviewOutcome {
        decision: verdict.decision,
        confidence: verdict.confidence,
        reason: verdict.reason,
        status: status.to_string(),
        applied,
    })
}

async fn set_state(tasks: &TaskMap, id: Uuid, state: ReviewTaskState) {
    tasks.write().await.set(id, state);
}
