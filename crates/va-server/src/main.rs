//! SmartVA RS Server
//!
//! Wires configuration, storage, email delivery, the background job worker
//! and the HTTP API into one process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use va_api::AppState;
use va_core::config::{AppConfig, EmailConfig, EmailDeliveryMethod, StorageBackend};
use va_db::{Database, PgJobQueue, Stores};
use va_notifications::{
    ConsoleEmailSender, EmailSender, JobQueue, JobWorker, MemoryEmailSender, MemoryJobQueue,
    ResendEmailSender,
};
use va_services::{handlers::visitor_purge_job, register_job_handlers, ServiceContext};

mod health;
mod metrics;

use health::{HealthChecker, HealthConfig};
use metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        warn!("Failed to load config from env: {}, using defaults", e);
        AppConfig::default()
    });

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        storage = ?config.storage,
        "Starting SmartVA RS"
    );

    let storage = open_storage(&config).await?;
    let ctx = ServiceContext::new(
        &config,
        storage.stores.clone(),
        email_sender(&config.email),
        storage.jobs.clone(),
    );

    // Background jobs
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = if config.jobs.enabled {
        let mut worker = JobWorker::new(storage.jobs.clone(), config.jobs.queue.clone())
            .poll_interval(Duration::from_millis(config.jobs.poll_interval_ms));
        register_job_handlers(&mut worker, &ctx);
        if let Err(e) = storage
            .jobs
            .ensure_recurring(visitor_purge_job(&config.jobs.queue))
            .await
        {
            warn!(error = %e, "Could not schedule the visitor retention sweep");
        }
        Some(tokio::spawn(async move { worker.run(shutdown_rx).await }))
    } else {
        info!("Job worker disabled");
        None
    };

    let mut health = HealthChecker::new(HealthConfig::default())
        .with_job_queue(storage.jobs.clone(), config.jobs.queue.clone())
        .with_hub(ctx.hub.clone());
    if let Some(db) = &storage.database {
        health = health.with_database(db.clone());
    }

    let app = build_router(
        AppState::new(ctx),
        Arc::new(health),
        Arc::new(Metrics::new()),
        &config,
    );

    let addr = config.server_addr();
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker {
        if let Err(e) = handle.await {
            error!(error = %e, "Job worker ended abnormally");
        }
    }
    if let Some(db) = &storage.database {
        db.close().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,va_server=debug,va_api=debug,va_services=debug,tower_http=debug".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

struct Storage {
    stores: Stores,
    jobs: Arc<dyn JobQueue>,
    database: Option<Database>,
}

async fn open_storage(config: &AppConfig) -> anyhow::Result<Storage> {
    match config.storage {
        StorageBackend::Postgres => {
            let db = Database::connect(&config.database)
                .await
                .context("connecting to database")?;
            db.migrate().await.context("running migrations")?;
            info!("Connected to database");
            Ok(Storage {
                stores: Stores::postgres(db.pool().clone()),
                jobs: Arc::new(PgJobQueue::new(db.pool().clone())),
                database: Some(db),
            })
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            Ok(Storage {
                stores: Stores::memory(),
                jobs: Arc::new(MemoryJobQueue::new()),
                database: None,
            })
        }
    }
}

fn email_sender(config: &EmailConfig) -> Arc<dyn EmailSender> {
    match config.delivery_method {
        EmailDeliveryMethod::Resend => match config.resend_api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Arc::new(ResendEmailSender::new(key.trim())),
            _ => {
                warn!("RESEND_API_KEY is not set, logging emails instead");
                Arc::new(ConsoleEmailSender::new())
            }
        },
        EmailDeliveryMethod::Console => Arc::new(ConsoleEmailSender::new()),
        EmailDeliveryMethod::Test => Arc::new(MemoryEmailSender::new()),
    }
}

/// Origins allowed to call the API with credentials
fn cors_layer(frontend_urls: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = frontend_urls
        .iter()
        .filter_map(|url| match HeaderValue::from_str(url.trim_end_matches('/')) {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!(url = %url, "Ignoring invalid frontend URL for CORS");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

fn build_router(
    state: AppState,
    health: Arc<HealthChecker>,
    metrics: Arc<Metrics>,
    config: &AppConfig,
) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(health);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus))
        .route("/metrics.json", get(metrics::json))
        .with_state(metrics.clone());

    Router::new()
        .merge(health_routes)
        .merge(metrics_routes)
        .merge(va_api::router().with_state(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_seconds,
                )))
                .layer(CompressionLayer::new())
                .layer(cors_layer(&config.frontend.urls)),
        )
        .layer(middleware::from_fn_with_state(
            metrics,
            metrics::track,
        ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use va_services::testing::TestContext;

    const FRONTEND: &str = "http://localhost:5173";

    fn test_app() -> Router {
        let t = TestContext::new();
        let health = HealthChecker::new(HealthConfig::default())
            .with_job_queue(t.jobs.clone(), "default")
            .with_hub(t.ctx.hub.clone());
        let mut config = AppConfig::default();
        config.frontend.urls = vec![format!("{}/", FRONTEND)];
        build_router(
            AppState::new(t.ctx.clone()),
            Arc::new(health),
            Arc::new(Metrics::new()),
            &config,
        )
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn test_root_endpoint() {
        let (status, body) = get(test_app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "SmartVA backend is alive");
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (status, body) = get(test_app(), "/health/live").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");

        let (status, body) = get(test_app(), "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        let report: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(report["status"], "healthy");
    }

    #[tokio::test]
    async fn test_metrics_count_requests() {
        let app = test_app();
        let (status, _) = get(app.clone(), "/task/getAllTasks").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = get(app, "/metrics.json").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["http"]["4xx"], 1);
    }

    #[tokio::test]
    async fn test_cors_allows_frontend_with_credentials() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/task/getAllTasks")
                    .header(header::ORIGIN, FRONTEND)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            FRONTEND
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_cors_rejects_unknown_origin() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/task/getAllTasks")
                    .header(header::ORIGIN, "https://evil.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
