//! # Structured Logging Module
//!
//! Environment-aware structured logging for the queue, its workers and the
//! notification listener.

use chrono::Utc;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let layer = if use_json_format() {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .boxed()
        };

        // Another subscriber may already be installed (tests, embedding binaries)
        if tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing");
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("WORKOUT_QUEUE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn use_json_format() -> bool {
    std::env::var("WORKOUT_QUEUE_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for job lifecycle operations
pub fn log_job_operation(
    operation: &str,
    job_id: Uuid,
    worker_id: Option<&str>,
    status: &str,
    retry_count: Option<i32>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        job_id = %job_id,
        worker_id = worker_id,
        status = %status,
        retry_count = retry_count,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "JOB_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
