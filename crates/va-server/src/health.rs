//! Health checks
//!
//! Liveness is a constant; readiness probes the database (when Postgres
//! storage is configured) and the job queue, caching the report briefly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use va_db::Database;
use va_notifications::{JobQueue, NotificationHub};

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }

    fn worst(self, other: HealthStatus) -> HealthStatus {
        use HealthStatus::*;
        match (self, other) {
            (Unhealthy, _) | (_, Unhealthy) => Unhealthy,
            (Degraded, _) | (_, Degraded) => Degraded,
            _ => Healthy,
        }
    }
}

/// Individual component health
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Overall health report
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Timeout for individual checks
    pub check_timeout: Duration,
    /// How long a report is reused
    pub cache_duration: Duration,
    /// Pending jobs above this mark the queue as degraded
    pub queue_backlog_warning: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(5),
            cache_duration: Duration::from_secs(10),
            queue_backlog_warning: 1000,
        }
    }
}

struct CachedHealth {
    report: HealthReport,
    cached_at: Instant,
}

pub struct HealthChecker {
    config: HealthConfig,
    start_time: Instant,
    cache: RwLock<Option<CachedHealth>>,
    database: Option<Database>,
    jobs: Option<(Arc<dyn JobQueue>, String)>,
    hub: Option<Arc<NotificationHub>>,
}

impl HealthChecker {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            cache: RwLock::new(None),
            database: None,
            jobs: None,
            hub: None,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_job_queue(mut self, queue: Arc<dyn JobQueue>, name: impl Into<String>) -> Self {
        self.jobs = Some((queue, name.into()));
        self
    }

    pub fn with_hub(mut self, hub: Arc<NotificationHub>) -> Self {
        self.hub = Some(hub);
        self
    }

    /// Get cached health or perform checks
    pub async fn check(&self) -> HealthReport {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.cached_at.elapsed() < self.config.cache_duration {
                    debug!("Returning cached health report");
                    return cached.report.clone();
                }
            }
        }

        let report = self.perform_checks().await;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedHealth {
            report: report.clone(),
            cached_at: Instant::now(),
        });
        report
    }

    async fn perform_checks(&self) -> HealthReport {
        let mut components = Vec::new();

        if let Some(database) = &self.database {
            components.push(self.check_database(database).await);
        }
        if let Some((queue, name)) = &self.jobs {
            components.push(self.check_jobs(queue.as_ref(), name).await);
        }
        if let Some(hub) = &self.hub {
            components.push(ComponentHealth {
                name: "realtime".to_string(),
                status: HealthStatus::Healthy,
                message: None,
                response_time_ms: 0,
                details: Some(serde_json::json!({ "active_rooms": hub.active_rooms() })),
            });
        }

        let status = components
            .iter()
            .fold(HealthStatus::Healthy, |acc, c| acc.worst(c.status));

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now(),
        }
    }

    async fn check_database(&self, database: &Database) -> ComponentHealth {
        let start = Instant::now();
        let (status, message) =
            match tokio::time::timeout(self.config.check_timeout, database.ping()).await {
                Ok(Ok(())) => (HealthStatus::Healthy, "Connected".to_string()),
                Ok(Err(e)) => {
                    warn!(error = %e, "Database health check failed");
                    (HealthStatus::Unhealthy, e.to_string())
                }
                Err(_) => (HealthStatus::Unhealthy, "Timed out".to_string()),
            };
        let stats = database.stats();

        ComponentHealth {
            name: "database".to_string(),
            status,
            message: Some(message),
            response_time_ms: start.elapsed().as_millis() as u64,
            details: Some(serde_json::json!({
                "type": "postgresql",
                "pool_size": stats.size,
                "idle_connections": stats.idle,
            })),
        }
    }

    async fn check_jobs(&self, queue: &dyn JobQueue, name: &str) -> ComponentHealth {
        let start = Instant::now();
        let (status, message, pending) =
            match tokio::time::timeout(self.config.check_timeout, queue.pending_count(name)).await {
                Ok(Ok(pending)) if pending > self.config.queue_backlog_warning => (
                    HealthStatus::Degraded,
                    format!("{} jobs waiting", pending),
                    Some(pending),
                ),
                Ok(Ok(pending)) => (HealthStatus::Healthy, "Queue reachable".to_string(), Some(pending)),
                Ok(Err(e)) => {
                    warn!(error = %e, "Job queue health check failed");
                    (HealthStatus::Unhealthy, e.to_string(), None)
                }
                Err(_) => (HealthStatus::Unhealthy, "Timed out".to_string(), None),
            };

        ComponentHealth {
            name: "jobs".to_string(),
            status,
            message: Some(message),
            response_time_ms: start.elapsed().as_millis() as u64,
            details: Some(serde_json::json!({ "queue": name, "pending": pending })),
        }
    }
}

/// Liveness probe
pub async fn liveness() -> &'static str {
    "OK"
}

/// Readiness probe with the component report
pub async fn readiness(State(health): State<Arc<HealthChecker>>) -> (StatusCode, Json<HealthReport>) {
    let report = health.check().await;
    (report.http_status(), Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use va_notifications::{Job, MemoryJobQueue};

    #[tokio::test]
    async fn test_memory_components_are_healthy() {
        let queue = Arc::new(MemoryJobQueue::new());
        let checker = HealthChecker::new(HealthConfig::default())
            .with_job_queue(queue, "default")
            .with_hub(Arc::new(NotificationHub::new()));

        let report = checker.check().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.components.len(), 2);
        assert_eq!(report.http_status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_backlog_degrades() {
        let queue = Arc::new(MemoryJobQueue::new());
        for _ in 0..3 {
            queue
                .enqueue(Job::new("noop", serde_json::json!({})).queue("default"))
                .await
                .unwrap();
        }
        let checker = HealthChecker::new(HealthConfig {
            queue_backlog_warning: 2,
            ..Default::default()
        })
        .with_job_queue(queue, "default");

        let report = checker.check().await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(report.status.is_healthy());
    }

    #[tokio::test]
    async fn test_health_cache() {
        let checker = HealthChecker::new(HealthConfig {
            cache_duration: Duration::from_secs(60),
            ..Default::default()
        });

        let first = checker.check().await;
        let second = checker.check().await;
        assert_eq!(first.timestamp, second.timestamp);
    }

    #[test]
    fn test_unhealthy_is_503() {
        let report = HealthReport {
            status: HealthStatus::Unhealthy,
            version: "1.0".to_string(),
            uptime_seconds: 1,
            components: vec![],
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(report.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(HealthStatus::Degraded.worst(HealthStatus::Unhealthy), HealthStatus::Unhealthy);
    }
}
