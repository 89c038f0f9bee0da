//! Request metrics
//!
//! Prometheus text at `/metrics`, the same counters as JSON at
//! `/metrics.json`. Requests are also counted per API resource so the task,
//! event and document traffic can be told apart.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info_span, Instrument};

/// First path segments the API serves; everything else is `other`
const RESOURCES: [&str; 11] = [
    "user", "task", "events", "document", "contact", "visitors", "notes", "profile", "ws",
    "health", "metrics",
];

fn resource_index(path: &str) -> usize {
    let first = path.trim_start_matches('/').split('/').next().unwrap_or("");
    let first = first.strip_suffix(".json").unwrap_or(first);
    RESOURCES
        .iter()
        .position(|r| *r == first)
        .unwrap_or(RESOURCES.len())
}

fn load(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

pub struct Metrics {
    requests: AtomicU64,
    success: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    duration_ms: AtomicU64,
    in_flight: AtomicU64,
    /// One slot per entry of `RESOURCES`, plus `other`
    by_resource: [AtomicU64; RESOURCES.len() + 1],
    started: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            success: AtomicU64::new(0),
            client_errors: AtomicU64::new(0),
            server_errors: AtomicU64::new(0),
            duration_ms: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            by_resource: std::array::from_fn(|_| AtomicU64::new(0)),
            started: Instant::now(),
        }
    }

    pub fn observe(&self, path: &str, status: StatusCode, elapsed_ms: u64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.duration_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
        self.by_resource[resource_index(path)].fetch_add(1, Ordering::Relaxed);

        let class = if status.is_success() {
            &self.success
        } else if status.is_client_error() {
            &self.client_errors
        } else if status.is_server_error() {
            &self.server_errors
        } else {
            return;
        };
        class.fetch_add(1, Ordering::Relaxed);
    }

    fn resources(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        RESOURCES
            .iter()
            .copied()
            .chain(std::iter::once("other"))
            .zip(self.by_resource.iter().map(load))
    }

    /// Prometheus exposition format
    pub fn export_prometheus(&self) -> String {
        let mut out = String::new();
        let mut metric = |name: &str, kind: &str, help: &str, samples: &[(String, u64)]| {
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} {}", name, kind);
            for (labels, value) in samples {
                let _ = writeln!(out, "{}{} {}", name, labels, value);
            }
        };

        metric(
            "smartva_http_requests_total",
            "counter",
            "HTTP requests served",
            &[(String::new(), load(&self.requests))],
        );
        metric(
            "smartva_http_responses_total",
            "counter",
            "HTTP responses by status class",
            &[
                ("{class=\"2xx\"}".to_string(), load(&self.success)),
                ("{class=\"4xx\"}".to_string(), load(&self.client_errors)),
                ("{class=\"5xx\"}".to_string(), load(&self.server_errors)),
            ],
        );
        let per_resource: Vec<(String, u64)> = self
            .resources()
            .map(|(name, count)| (format!("{{resource=\"{}\"}}", name), count))
            .collect();
        metric(
            "smartva_http_requests_by_resource_total",
            "counter",
            "HTTP requests by API resource",
            &per_resource,
        );
        metric(
            "smartva_http_request_duration_ms_total",
            "counter",
            "Time spent serving requests in milliseconds",
            &[(String::new(), load(&self.duration_ms))],
        );
        metric(
            "smartva_http_requests_in_flight",
            "gauge",
            "Requests currently being served",
            &[(String::new(), load(&self.in_flight))],
        );
        metric(
            "smartva_uptime_seconds",
            "gauge",
            "Seconds since the server started",
            &[(String::new(), self.started.elapsed().as_secs())],
        );

        out
    }

    pub fn export_json(&self) -> serde_json::Value {
        let resources: serde_json::Map<String, serde_json::Value> = self
            .resources()
            .map(|(name, count)| (name.to_string(), count.into()))
            .collect();

        serde_json::json!({
            "http": {
                "requests": load(&self.requests),
                "2xx": load(&self.success),
                "4xx": load(&self.client_errors),
                "5xx": load(&self.server_errors),
                "duration_ms": load(&self.duration_ms),
                "in_flight": load(&self.in_flight),
            },
            "resources": resources,
            "uptime_seconds": self.started.elapsed().as_secs(),
        })
    }
}

/// Counts every request and its outcome
pub async fn track(State(metrics): State<Arc<Metrics>>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    metrics.in_flight.fetch_add(1, Ordering::Relaxed);
    let response = next
        .run(request)
        .instrument(info_span!("request", %method, %path))
        .await;
    metrics.in_flight.fetch_sub(1, Ordering::Relaxed);

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let status = response.status();
    debug!(%method, %path, %status, elapsed_ms, "Request finished");
    metrics.observe(&path, status, elapsed_ms);

    response
}

pub async fn prometheus(State(metrics): State<Arc<Metrics>>) -> String {
    metrics.export_prometheus()
}

pub async fn json(State(metrics): State<Arc<Metrics>>) -> axum::Json<serde_json::Value> {
    axum::Json(metrics.export_json())
}
