//! Background job queue
//!
//! Scheduled work (event reminders, due-date notifications, expired event
//! cleanup, visitor retention) is persisted as [`Job`] rows and executed by
//! a polling [`JobWorker`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use va_core::Id;

/// Job type names
pub const SEND_EMAIL_REMINDER: &str = "send email reminder";
pub const CREATE_REMINDER_NOTIFICATION: &str = "create reminder notification";
pub const CREATE_EVENT_NOTIFICATION: &str = "create event notification";
pub const DELETE_EXPIRED_EVENT: &str = "delete expired event";
pub const PURGE_EXPIRED_VISITORS: &str = "purge expired visitors";

pub const DEFAULT_QUEUE: &str = "default";

/// A `running` job whose claim is older than this is assumed abandoned by a
/// crashed worker and may be claimed again
pub const LOCK_LIFETIME_SECS: i64 = 600;

/// Job errors
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),
    #[error("Job failed: {0}")]
    Failed(String),
    #[error("Queue error: {0}")]
    QueueError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        JobError::SerializationError(err.to_string())
    }
}

pub type JobResult<T> = Result<T, JobError>;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Retrying,
    Dead,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Retrying => "retrying",
            JobStatus::Dead => "dead",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "retrying" => Some(JobStatus::Retrying),
            "dead" => Some(JobStatus::Dead),
            _ => None,
        }
    }

    /// Waiting for its `run_at`
    pub fn is_runnable(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Retrying)
    }
}

/// Job priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Critical = 3,
}

impl JobPriority {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(value: i32) -> Self {
        match value {
            i32::MIN..=0 => JobPriority::Low,
            1 => JobPriority::Normal,
            2 => JobPriority::High,
            _ => JobPriority::Critical,
        }
    }
}

/// A background job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    /// Handler name, one of the job type constants
    pub job_type: String,
    pub queue: String,
    pub args: serde_json::Value,
    pub status: JobStatus,
    pub priority: JobPriority,
    pub retries: u32,
    pub max_retries: u32,
    /// Last error message
    pub error: Option<String>,
    /// Earliest time the job may run
    pub run_at: DateTime<Utc>,
    /// Re-run interval for recurring jobs
    pub repeat_every: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(job_type: impl Into<String>, args: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_type: job_type.into(),
            queue: DEFAULT_QUEUE.to_string(),
            args,
            status: JobStatus::Pending,
            priority: JobPriority::Normal,
            retries: 0,
            max_retries: 3,
            error: None,
            run_at: now,
            repeat_every: None,
            created_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    /// Build a job from typed arguments
    pub fn with_args<A: Serialize>(job_type: impl Into<String>, args: &A) -> JobResult<Self> {
        Ok(Self::new(job_type, serde_json::to_value(args)?))
    }

    /// Decode the arguments into their typed form
    pub fn parse_args<A: DeserializeOwned>(&self) -> JobResult<A> {
        Ok(serde_json::from_value(self.args.clone())?)
    }

    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Schedule for later
    pub fn run_at(mut self, at: DateTime<Utc>) -> Self {
        self.run_at = at;
        self
    }

    /// Schedule in N seconds
    pub fn run_in(mut self, seconds: i64) -> Self {
        self.run_at = Utc::now() + chrono::Duration::seconds(seconds);
        self
    }

    /// Run again every `seconds` after each completion
    pub fn repeat_every(mut self, seconds: i64) -> Self {
        self.repeat_every = Some(seconds);
        self
    }

    pub fn is_ready_at(&self, now: DateTime<Utc>) -> bool {
        (self.status.is_runnable() && now >= self.run_at) || self.is_stale_at(now)
    }

    /// Claimed but never finished within the lock lifetime
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Running
            && self
                .started_at
                .map_or(true, |started| now - started >= chrono::Duration::seconds(LOCK_LIFETIME_SECS))
    }

    /// Finished for good: nothing left to run or retry
    pub fn is_finished(&self) -> bool {
        self.status == JobStatus::Completed
    }

    pub fn can_retry(&self) -> bool {
        self.retries < self.max_retries
    }

    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark as completed, or reschedule a recurring job
    pub fn mark_completed(&mut self) {
        let now = Utc::now();
        self.finished_at = Some(now);
        match self.repeat_every {
            Some(seconds) => {
                self.status = JobStatus::Pending;
                self.retries = 0;
                self.error = None;
                self.run_at = now + chrono::Duration::seconds(seconds);
            }
            None => self.status = JobStatus::Completed,
        }
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());

        if self.can_retry() {
            self.status = JobStatus::Retrying;
            self.retries += 1;
            // Exponential backoff: 2^retries minutes
            let delay = 2_i64.pow(self.retries) * 60;
            self.run_at = Utc::now() + chrono::Duration::seconds(delay);
        } else {
            self.status = JobStatus::Dead;
        }
    }
}

/// Arguments of `send email reminder`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailReminderArgs {
    pub event_id: Id,
    pub email: String,
    pub name: Option<String>,
}

/// Arguments of `create reminder notification` and `create event notification`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationArgs {
    pub user_id: Id,
    pub message: String,
}

/// Arguments of `delete expired event`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiredEventArgs {
    pub event_id: Id,
}

/// Job queue trait
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: Job) -> JobResult<String>;

    async fn get(&self, job_id: &str) -> JobResult<Option<Job>>;

    /// Claim the next ready job, marking it running
    async fn dequeue(&self, queue: &str) -> JobResult<Option<Job>>;

    async fn update(&self, job: &Job) -> JobResult<()>;

    async fn delete(&self, job_id: &str) -> JobResult<()>;

    async fn pending_count(&self, queue: &str) -> JobResult<usize>;

    async fn list(&self, queue: &str, status: Option<JobStatus>) -> JobResult<Vec<Job>>;

    /// Enqueue a recurring job unless one of the same type is already scheduled
    async fn ensure_recurring(&self, job: Job) -> JobResult<String> {
        let existing = self
            .list(&job.queue, None)
            .await?
            .into_iter()
            .find(|j| j.job_type == job.job_type && j.repeat_every.is_some() && j.status != JobStatus::Dead);
        match existing {
            Some(existing) => Ok(existing.id),
            None => self.enqueue(job).await,
        }
    }
}

/// Picks the job `dequeue` should claim: highest priority, then earliest `run_at`
pub fn next_ready<'a>(jobs: impl Iterator<Item = &'a Job>, queue: &str, now: DateTime<Utc>) -> Option<&'a Job> {
    jobs.filter(|j| j.queue == queue && j.is_ready_at(now))
        .min_by(|a, b| b.priority.cmp(&a.priority).then(a.run_at.cmp(&b.run_at)))
}

/// In-memory job queue for development/testing
#[derive(Default)]
pub struct MemoryJobQueue {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every job in every queue
    pub async fn all(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Jobs of one type, any queue
    pub async fn of_type(&self, job_type: &str) -> Vec<Job> {
        self.jobs
            .read()
            .await
            .values()
            .filter(|j| j.job_type == job_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: Job) -> JobResult<String> {
        let id = job.id.clone();
        self.jobs.write().await.insert(id.clone(), job);
        Ok(id)
    }

    async fn get(&self, job_id: &str) -> JobResult<Option<Job>> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn dequeue(&self, queue: &str) -> JobResult<Option<Job>> {
        let mut jobs = self.jobs.write().await;

        let job_id = next_ready(jobs.values(), queue, Utc::now()).map(|j| j.id.clone());

        Ok(job_id.and_then(|id| {
            jobs.get_mut(&id).map(|job| {
                job.mark_running();
                job.clone()
            })
        }))
    }

    async fn update(&self, job: &Job) -> JobResult<()> {
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn delete(&self, job_id: &str) -> JobResult<()> {
        self.jobs.write().await.remove(job_id);
        Ok(())
    }

    async fn pending_count(&self, queue: &str) -> JobResult<usize> {
        let jobs = self.jobs.read().await;
        Ok(jobs
            .values()
            .filter(|j| j.queue == queue && j.status == JobStatus::Pending)
            .count())
    }

    async fn list(&self, queue: &str, status: Option<JobStatus>) -> JobResult<Vec<Job>> {
        let jobs = self.jobs.read().await;
        let mut listed: Vec<Job> = jobs
            .values()
            .filter(|j| j.queue == queue && status.map_or(true, |s| j.status == s))
            .cloned()
            .collect();
        listed.sort_by_key(|j| j.run_at);
        Ok(listed)
    }

}

/// Handler for a specific job type
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> JobResult<()>;
}

/// Job worker for processing jobs
pub struct JobWorker {
    queue: Arc<dyn JobQueue>,
    queue_name: String,
    poll_interval: Duration,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobWorker {
    pub fn new(queue: Arc<dyn JobQueue>, queue_name: impl Into<String>) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
            poll_interval: Duration::from_millis(1000),
            handlers: HashMap::new(),
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Register a handler for a job type
    pub fn register(&mut self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(job_type.into(), handler);
    }

    pub fn handles(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Process one job (returns true if a job was processed)
    pub async fn process_one(&self) -> JobResult<bool> {
        let Some(mut job) = self.queue.dequeue(&self.queue_name).await? else {
            return Ok(false);
        };

        match self.handlers.get(&job.job_type) {
            None => {
                let message = format!("Unknown job type: {}", job.job_type);
                tracing::warn!(job_id = %job.id, "{}", message);
                job.mark_failed(message);
            }
            Some(handler) => match handler.handle(&job).await {
                Ok(()) => {
                    tracing::debug!(job_id = %job.id, job_type = %job.job_type, "Job completed");
                    job.mark_completed();
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %job.id,
                        job_type = %job.job_type,
                        retries = job.retries,
                        error = %e,
                        "Job failed"
                    );
                    job.mark_failed(e.to_string());
                }
            },
        }

        // One-shot jobs leave the table once done; failures stay for retry or inspection
        if job.is_finished() {
            self.queue.delete(&job.id).await?;
        } else {
            self.queue.update(&job).await?;
        }
        Ok(true)
    }

    /// Run until every ready job has been processed
    pub async fn drain(&self) -> JobResult<usize> {
        let mut processed = 0;
        while self.process_one().await? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Run the worker loop until `shutdown` flips to true
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(queue = %self.queue_name, "Job worker started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let wait = match self.process_one().await {
                Ok(true) => continue,
                Ok(false) => self.poll_interval,
                Err(e) => {
                    tracing::error!("Job worker error: {}", e);
                    Duration::from_secs(1)
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!(queue = %self.queue_name, "Job worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl JobHandler for Counting {
        async fn handle(&self, _job: &Job) -> JobResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(JobError::Failed("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    fn counting(fail: bool) -> Arc<Counting> {
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test]
    async fn test_enqueue_and_dequeue() {
        let queue = MemoryJobQueue::new();

        let job = Job::new("test_job", serde_json::json!({"key": "value"}));
        let job_id = queue.enqueue(job).await.unwrap();

        let job = queue.dequeue(DEFAULT_QUEUE).await.unwrap().unwrap();
        assert_eq!(job.id, job_id);
        assert_eq!(job.status, JobStatus::Running);
        assert!(queue.dequeue(DEFAULT_QUEUE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_job_priority() {
        let queue = MemoryJobQueue::new();

        queue
            .enqueue(Job::new("low", serde_json::json!({})).priority(JobPriority::Low))
            .await
            .unwrap();
        queue
            .enqueue(Job::new("high", serde_json::json!({})).priority(JobPriority::High))
            .await
            .unwrap();

        let first = queue.dequeue(DEFAULT_QUEUE).await.unwrap().unwrap();
        assert_eq!(first.job_type, "high");
    }

    #[tokio::test]
    async fn test_scheduled_jobs() {
        let queue = MemoryJobQueue::new();

        queue.enqueue(Job::new("future", serde_json::json!({})).run_in(3600)).await.unwrap();
        queue.enqueue(Job::new("now", serde_json::json!({}))).await.unwrap();

        let dequeued = queue.dequeue(DEFAULT_QUEUE).await.unwrap().unwrap();
        assert_eq!(dequeued.job_type, "now");
        assert!(queue.dequeue(DEFAULT_QUEUE).await.unwrap().is_none());
    }

    #[test]
    fn test_job_retry() {
        let mut job = Job::new("test", serde_json::json!({})).max_retries(2);

        job.mark_running();
        job.mark_failed("Error 1");
        assert_eq!(job.status, JobStatus::Retrying);
        assert_eq!(job.retries, 1);
        assert!(job.run_at > Utc::now());

        job.mark_running();
        job.mark_failed("Error 2");
        assert_eq!(job.retries, 2);

        job.mark_running();
        job.mark_failed("Error 3");
        assert_eq!(job.status, JobStatus::Dead);
        assert_eq!(job.error.as_deref(), Some("Error 3"));
    }

    #[test]
    fn test_recurring_job_reschedules() {
        let mut job = Job::new(PURGE_EXPIRED_VISITORS, serde_json::json!({})).repeat_every(86_400);
        job.mark_running();
        job.mark_completed();

        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.run_at > Utc::now() + chrono::Duration::hours(23));
    }

    #[test]
    fn test_typed_args() {
        let event_id = uuid::Uuid::new_v4();
        let job = Job::with_args(DELETE_EXPIRED_EVENT, &ExpiredEventArgs { event_id }).unwrap();
        assert_eq!(job.args["eventId"], event_id.to_string());
        assert_eq!(job.parse_args::<ExpiredEventArgs>().unwrap().event_id, event_id);
        assert!(job.parse_args::<NotificationArgs>().is_err());
    }

    #[tokio::test]
    async fn test_worker_runs_handlers() {
        let queue = Arc::new(MemoryJobQueue::new());
        let ok = counting(false);
        let bad = counting(true);

        let mut worker = JobWorker::new(queue.clone(), DEFAULT_QUEUE);
        worker.register("ok", ok.clone());
        worker.register("bad", bad.clone());

        let ok_id = queue.enqueue(Job::new("ok", serde_json::json!({}))).await.unwrap();
        let bad_id = queue.enqueue(Job::new("bad", serde_json::json!({}))).await.unwrap();
        let unknown_id = queue.enqueue(Job::new("mystery", serde_json::json!({}))).await.unwrap();

        assert_eq!(worker.drain().await.unwrap(), 3);
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);
        assert_eq!(bad.calls.load(Ordering::SeqCst), 1);

        let get = |id: String| {
            let queue = queue.clone();
            async move { queue.get(&id).await.unwrap().unwrap() }
        };
        assert!(queue.get(&ok_id).await.unwrap().is_none());
        assert_eq!(get(bad_id).await.status, JobStatus::Retrying);
        assert!(get(unknown_id).await.error.unwrap().contains("Unknown job type"));
    }

    #[tokio::test]
    async fn test_ensure_recurring_is_idempotent() {
        let queue = MemoryJobQueue::new();
        let first = queue
            .ensure_recurring(Job::new(PURGE_EXPIRED_VISITORS, serde_json::json!({})).repeat_every(60))
            .await
            .unwrap();
        let second = queue
            .ensure_recurring(Job::new(PURGE_EXPIRED_VISITORS, serde_json::json!({})).repeat_every(60))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(queue.of_type(PURGE_EXPIRED_VISITORS).await.len(), 1);
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let queue = Arc::new(MemoryJobQueue::new());
        let worker = JobWorker::new(queue, DEFAULT_QUEUE).poll_interval(Duration::from_secs(60));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { worker.run(rx).await });
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_pending_count() {
        let queue = MemoryJobQueue::new();

        queue.enqueue(Job::new("a", serde_json::json!({}))).await.unwrap();
        queue.enqueue(Job::new("b", serde_json::json!({}))).await.unwrap();
        queue.enqueue(Job::new("c", serde_json::json!({})).queue("other")).await.unwrap();
        assert_eq!(queue.pending_count(DEFAULT_QUEUE).await.unwrap(), 2);

        queue.dequeue(DEFAULT_QUEUE).await.unwrap().unwrap();
        assert_eq!(queue.pending_count(DEFAULT_QUEUE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_completed_one_shot_jobs_are_removed() {
        let queue = Arc::new(MemoryJobQueue::new());
        let mut worker = JobWorker::new(queue.clone(), DEFAULT_QUEUE);
        worker.register("ok", counting(false));
        worker.register(PURGE_EXPIRED_VISITORS, counting(false));

        queue.enqueue(Job::new("ok", serde_json::json!({}))).await.unwrap();
        let recurring = queue
            .enqueue(Job::new(PURGE_EXPIRED_VISITORS, serde_json::json!({})).repeat_every(60))
            .await
            .unwrap();

        assert_eq!(worker.drain().await.unwrap(), 2);
        let left = queue.all().await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, recurring);
        assert_eq!(left[0].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_abandoned_claim_is_reclaimed() {
        let queue = MemoryJobQueue::new();
        let id = queue
            .ensure_recurring(Job::new(PURGE_EXPIRED_VISITORS, serde_json::json!({})).repeat_every(86_400))
            .await
            .unwrap();

        // Claimed by a worker that then died before reporting back.
        let mut claimed = queue.dequeue(DEFAULT_QUEUE).await.unwrap().unwrap();
        assert!(queue.dequeue(DEFAULT_QUEUE).await.unwrap().is_none());
        claimed.started_at = Some(Utc::now() - chrono::Duration::seconds(LOCK_LIFETIME_SECS + 1));
        queue.update(&claimed).await.unwrap();

        let again = queue
            .ensure_recurring(Job::new(PURGE_EXPIRED_VISITORS, serde_json::json!({})).repeat_every(86_400))
            .await
            .unwrap();
        assert_eq!(again, id);

        let reclaimed = queue.dequeue(DEFAULT_QUEUE).await.unwrap().unwrap();
        assert_eq!(reclaimed.id, id);
        assert_eq!(reclaimed.status, JobStatus::Running);
        assert!(!reclaimed.is_stale_at(Utc::now()));
    }
}
