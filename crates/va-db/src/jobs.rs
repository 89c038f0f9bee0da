//! Postgres-backed job queue

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use va_notifications::jobs::{
    Job, JobError, JobPriority, JobQueue, JobResult, JobStatus, LOCK_LIFETIME_SECS,
};

const JOB_COLUMNS: &str = "id, job_type, queue, args, status, priority, retries, max_retries, \
     error, run_at, repeat_seconds, created_at, started_at, finished_at";

/// Job database entity
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: String,
    pub job_type: String,
    pub queue: String,
    pub args: Json<serde_json::Value>,
    pub status: String,
    pub priority: i32,
    pub retries: i32,
    pub max_retries: i32,
    pub error: Option<String>,
    pub run_at: DateTime<Utc>,
    pub repeat_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for Job {
    type Error = JobError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::parse(&row.status)
            .ok_or_else(|| JobError::QueueError(format!("unknown job status: {}", row.status)))?;
        Ok(Job {
            id: row.id,
            job_type: row.job_type,
            queue: row.queue,
            args: row.args.0,
            status,
            priority: JobPriority::from_i32(row.priority),
            retries: u32::try_from(row.retries).unwrap_or_default(),
            max_retries: u32::try_from(row.max_retries).unwrap_or_default(),
            error: row.error,
            run_at: row.run_at,
            repeat_every: row.repeat_seconds,
            created_at: row.created_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}

fn queue_error(err: sqlx::Error) -> JobError {
    JobError::QueueError(err.to_string())
}

fn to_jobs(rows: Vec<JobRow>) -> JobResult<Vec<Job>> {
    rows.into_iter().map(Job::try_from).collect()
}

/// Job queue stored in the `jobs` table
///
/// Workers claim jobs with `FOR UPDATE SKIP LOCKED`, so several server
/// instances can poll the same queue.
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job: Job) -> JobResult<String> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, job_type, queue, args, status, priority, retries, max_retries,
                              error, run_at, repeat_seconds, created_at, started_at, finished_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&job.id)
        .bind(&job.job_type)
        .bind(&job.queue)
        .bind(Json(&job.args))
        .bind(job.status.as_str())
        .bind(job.priority.as_i32())
        .bind(job.retries as i32)
        .bind(job.max_retries as i32)
        .bind(&job.error)
        .bind(job.run_at)
        .bind(job.repeat_every)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .execute(&self.pool)
        .await
        .map_err(queue_error)?;

        Ok(job.id)
    }

    async fn get(&self, job_id: &str) -> JobResult<Option<Job>> {
        let sql = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(queue_error)?;

        row.map(Job::try_from).transpose()
    }

    async fn dequeue(&self, queue: &str) -> JobResult<Option<Job>> {
        let sql = format!(
            r#"
            UPDATE jobs SET status = 'running', started_at = NOW()
            WHERE id = (
                SELECT id FROM jobs
                WHERE queue = $1
                  AND ((status IN ('pending', 'retrying') AND run_at <= NOW())
                       OR (status = 'running'
                           AND (started_at IS NULL
                                OR started_at <= NOW() - make_interval(secs => $2))))
                ORDER BY priority DESC, run_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(queue)
            .bind(LOCK_LIFETIME_SECS as f64)
            .fetch_optional(&self.pool)
            .await
            .map_err(queue_error)?;

        row.map(Job::try_from).transpose()
    }

    async fn update(&self, job: &Job) -> JobResult<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = $2, retries = $3, error = $4, run_at = $5,
                started_at = $6, finished_at = $7
            WHERE id = $1
            "#,
        )
        .bind(&job.id)
        .bind(job.status.as_str())
        .bind(job.retries as i32)
        .bind(&job.error)
        .bind(job.run_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .execute(&self.pool)
        .await
        .map_err(queue_error)?;

        Ok(())
    }

    async fn delete(&self, job_id: &str) -> JobResult<()> {
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(queue_error)?;
        Ok(())
    }

    async fn pending_count(&self, queue: &str) -> JobResult<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE queue = $1 AND status = 'pending'")
                .bind(queue)
                .fetch_one(&self.pool)
                .await
                .map_err(queue_error)?;
        Ok(count as usize)
    }

    async fn list(&self, queue: &str, status: Option<JobStatus>) -> JobResult<Vec<Job>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE queue = $1 AND ($2::text IS NULL OR status = $2) ORDER BY run_at",
            JOB_COLUMNS
        );
        let rows = sqlx::query_as::<_, JobRow>(&sql)
            .bind(queue)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(queue_error)?;

        to_jobs(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> JobRow {
        let now = Utc::now();
        JobRow {
            id: "job-1".into(),
            job_type: "delete expired event".into(),
            queue: "default".into(),
            args: Json(serde_json::json!({ "eventId": "x" })),
            status: status.into(),
            priority: 2,
            retries: 1,
            max_retries: 3,
            error: None,
            run_at: now,
            repeat_seconds: Some(60),
            created_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn test_row_conversion() {
        let job = Job::try_from(row("retrying")).unwrap();
        assert_eq!(job.status, JobStatus::Retrying);
        assert_eq!(job.priority, JobPriority::High);
        assert_eq!(job.repeat_every, Some(60));
        assert_eq!(job.args["eventId"], "x");
    }

    #[test]
    fn test_unknown_status() {
        assert!(Job::try_from(row("exploded")).is_err());
    }
}
