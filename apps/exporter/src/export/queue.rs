//! Bounded-concurrency export queue.
//!
//! Tasks move `pending → processing → {completed | failed}`. Pending tasks
//! start in enqueue order whenever a slot below `max_concurrent` frees up.
//! Only pending tasks can be cancelled; in-flight work always runs to
//! completion. Finished tasks stay queryable until `retain_finished` newer
//! ones have finished after them.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::ExportError;
use crate::export::generator::{ExportIssue, ExportResult, Performance};
use crate::export::options::ExportOptions;
use crate::models::ContentSnapshot;

/// Progress reported once generation finished and the payload is being recorded.
pub const PROGRESS_GENERATED: u8 = 90;
pub const PROGRESS_DONE: u8 = 100;
pub const DEFAULT_FINISHED_RETENTION: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Attempt budget captured when a task is enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Base delay; the wait after failed attempt `k` is `base_delay * k`.
    pub base_delay: Duration,
    /// Budget for a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportTask {
    pub id: Uuid,
    pub snapshot: Arc<ContentSnapshot>,
    pub options: ExportOptions,
    pub status: TaskStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub result: Option<ExportResult>,
    pub error: Option<ExportIssue>,
    pub policy: RetryPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    pub max_concurrent: usize,
}

/// Everything a processor needs to run one task.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub task_id: Uuid,
    pub snapshot: Arc<ContentSnapshot>,
    pub options: ExportOptions,
    pub policy: RetryPolicy,
}

/// Runs a dequeued task to a final result.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    async fn process(&self, job: ExportJob, progress: ProgressReporter) -> ExportResult;
}

/// Lets a processor move its task's progress forward while it runs.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    queue: Weak<ExportQueue>,
    task_id: Uuid,
}

impl ProgressReporter {
    /// Progress never moves backwards and only changes while processing.
    pub fn report(&self, progress: u8) {
        let Some(queue) = self.queue.upgrade() else {
            return;
        };
        let mut state = queue.state.lock();
        if let Some(task) = state.tasks.get_mut(&self.task_id) {
            if task.status == TaskStatus::Processing && progress > task.progress {
                task.progress = progress.min(PROGRESS_DONE);
            }
        }
    }
}

struct QueueState {
    tasks: HashMap<Uuid, ExportTask>,
    pending: VecDeque<Uuid>,
    running: usize,
    max_concurrent: usize,
    /// Terminal tasks, oldest first.
    finished: VecDeque<Uuid>,
    retain_finished: usize,
}

impl QueueState {
    fn retire(&mut self, id: Uuid) {
        self.finished.push_back(id);
        self.prune_finished();
    }

    fn prune_finished(&mut self) {
        while self.finished.len() > self.retain_finished {
            if let Some(old) = self.finished.pop_front() {
                self.tasks.remove(&old);
                debug!(task_id = %old, "Dropped finished export task");
            }
        }
    }
}

pub struct ExportQueue {
    state: Mutex<QueueState>,
    processor: Arc<dyn TaskProcessor>,
    changed: Notify,
}

impl ExportQueue {
    pub fn new(processor: Arc<dyn TaskProcessor>, max_concurrent: usize) -> Arc<Self> {
        Self::with_retention(processor, max_concurrent, DEFAULT_FINISHED_RETENTION)
    }

    /// Like [`ExportQueue::new`], keeping at most `retain_finished` finished tasks.
    pub fn with_retention(
        processor: Arc<dyn TaskProcessor>,
        max_concurrent: usize,
        retain_finished: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState {
                tasks: HashMap::new(),
                pending: VecDeque::new(),
                running: 0,
                max_concurrent: max_concurrent.max(1),
                finished: VecDeque::new(),
                retain_finished,
            }),
            processor,
            changed: Notify::new(),
        })
    }

    /// Enqueues a task and immediately tries to start it. Must be called
    /// from within a tokio runtime.
    pub fn add_task(
        self: &Arc<Self>,
        snapshot: Arc<ContentSnapshot>,
        options: ExportOptions,
        policy: RetryPolicy,
    ) -> Uuid {
        let id = Uuid::new_v4();
        {
            let mut state = self.state.lock();
            state.tasks.insert(
                id,
                ExportTask {
                    id,
                    snapshot,
                    options,
                    status: TaskStatus::Pending,
                    progress: 0,
                    created_at: Utc::now(),
                    start_time: None,
                    end_time: None,
                    result: None,
                    error: None,
                    policy,
                },
            );
            state.pending.push_back(id);
        }
        debug!(task_id = %id, "Export task queued");
        self.pump();
        id
    }

    pub fn get_task(&self, id: Uuid) -> Option<ExportTask> {
        self.state.lock().tasks.get(&id).cloned()
    }

    /// Cancels a pending task. Returns false for processing, finished or
    /// unknown tasks.
    pub fn cancel_task(&self, id: Uuid) -> bool {
        {
            let mut state = self.state.lock();
            let Some(task) = state.tasks.get_mut(&id) else {
                return false;
            };
            if task.status != TaskStatus::Pending {
                return false;
            }
            let err = ExportError::Cancelled(id.to_string());
            task.status = TaskStatus::Failed;
            task.end_time = Some(Utc::now());
            task.error = ExportIssue::from_error(&err).into_iter().next();
            state.pending.retain(|p| *p != id);
            state.retire(id);
        }
        info!(task_id = %id, "Export task cancelled");
        self.changed.notify_waiters();
        true
    }

    pub fn get_queue_status(&self) -> QueueStatus {
        let state = self.state.lock();
        let mut status = QueueStatus {
            total: state.tasks.len(),
            max_concurrent: state.max_concurrent,
            ..Default::default()
        };
        for task in state.tasks.values() {
            match task.status {
                TaskStatus::Pending => status.pending += 1,
                TaskStatus::Processing => status.processing += 1,
                TaskStatus::Completed => status.completed += 1,
                TaskStatus::Failed => status.failed += 1,
            }
        }
        status
    }

    /// Drops every pending task. Processing and finished tasks are kept.
    pub fn clear_queue(&self) -> usize {
        let removed = {
            let mut state = self.state.lock();
            let ids: Vec<Uuid> = state.pending.drain(..).collect();
            for id in &ids {
                state.tasks.remove(id);
            }
            ids.len()
        };
        if removed > 0 {
            info!(removed, "Cleared pending export tasks");
            self.changed.notify_waiters();
        }
        removed
    }

    /// Changes the ceiling for future scheduling. Running tasks are not
    /// interrupted when it shrinks.
    pub fn set_max_concurrent(self: &Arc<Self>, max_concurrent: usize) {
        self.state.lock().max_concurrent = max_concurrent.max(1);
        self.pump();
    }

    pub fn set_finished_retention(&self, retain_finished: usize) {
        let mut state = self.state.lock();
        state.retain_finished = retain_finished;
        state.prune_finished();
    }

    /// Resolves once the task reaches a terminal state. A finished task that
    /// was already pruned reports `TaskNotFound`.
    pub async fn wait_for(&self, id: Uuid) -> Result<ExportTask, ExportError> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.state.lock();
                match state.tasks.get(&id) {
                    None => return Err(ExportError::TaskNotFound(id)),
                    Some(task) if task.status.is_terminal() => return Ok(task.clone()),
                    Some(_) => {}
                }
            }

            notified.await;
        }
    }

    /// Starts pending tasks while slots are free.
    fn pump(self: &Arc<Self>) {
        let mut jobs = Vec::new();
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            while state.running < state.max_concurrent {
                let Some(id) = state.pending.pop_front() else {
                    break;
                };
                let Some(task) = state.tasks.get_mut(&id) else {
                    continue;
                };
                if task.status != TaskStatus::Pending {
                    continue;
                }
                task.status = TaskStatus::Processing;
                task.start_time = Some(Utc::now());
                task.progress = 0;
                state.running += 1;
                jobs.push(ExportJob {
                    task_id: id,
                    snapshot: Arc::clone(&task.snapshot),
                    options: task.options.clone(),
                    policy: task.policy,
                });
            }
        }

        if jobs.is_empty() {
            return;
        }
        self.changed.notify_waiters();

        for job in jobs {
            let queue = Arc::clone(self);
            tokio::spawn(async move {
                let task_id = job.task_id;
                debug!(task_id = %task_id, "Export task started");
                let start = Utc::now();
                let started = Instant::now();
                let reporter = ProgressReporter {
                    queue: Arc::downgrade(&queue),
                    task_id,
                };
                let processor = Arc::clone(&queue.processor);
                let handle = tokio::spawn(async move { processor.process(job, reporter).await });
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        let err = ExportError::Processing(format!("export task aborted: {e}"));
                        ExportResult::failed(&err, Performance::measure(start, started), 0)
                    }
                };
                queue.finish(task_id, result);
            });
        }
    }

    fn finish(self: &Arc<Self>, id: Uuid, result: ExportResult) {
        {
            let mut state = self.state.lock();
            state.running = state.running.saturating_sub(1);
            match state.tasks.get_mut(&id) {
                Some(task) => {
                    task.end_time = Some(Utc::now());
                    if result.success {
                        task.status = TaskStatus::Completed;
                        task.progress = PROGRESS_DONE;
                        info!(task_id = %id, attempts = result.attempts, "Export task completed");
                    } else {
                        task.status = TaskStatus::Failed;
                        task.error = result.errors.last().cloned();
                        warn!(task_id = %id, attempts = result.attempts, "Export task failed");
                    }
                    task.result = Some(result);
                    state.retire(id);
                }
                None => warn!(task_id = %id, "Finished task no longer tracked"),
            }
        }
        self.changed.notify_waiters();
        self.pump();
    }
}
