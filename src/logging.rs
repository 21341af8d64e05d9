//! # Structured Logging Module
//!
//! Environment-aware structured logging for tracing mailbox loops, handle
//! publication and connection lifecycles across threads.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let json = use_json_format();

        let console = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(EnvFilter::new(log_level.clone()))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(EnvFilter::new(log_level.clone()))
                .boxed()
        };

        // try_init: a host application may already own the global subscriber
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            level = %log_level,
            json = json,
            "STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("COURIER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    if let Ok(filter) = std::env::var("RUST_LOG") {
        return filter;
    }
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn use_json_format() -> bool {
    std::env::var("COURIER_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log structured data for mailbox loop operations
pub fn log_mailbox_operation(operation: &str, loop_name: &str, status: &str, details: Option<&str>) {
    tracing::debug!(
        operation = %operation,
        loop_name = %loop_name,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "MAILBOX_OPERATION"
    );
}

/// Log structured data for registry operations
pub fn log_registry_operation(operation: &str, worker_type: &str, status: &str) {
    tracing::debug!(
        operation = %operation,
        worker_type = %worker_type,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "REGISTRY_OPERATION"
    );
}

/// Log structured data for connection lifecycle transitions
pub fn log_connection_operation(
    operation: &str,
    worker_type: &str,
    connection_id: Option<&str>,
    from_state: &str,
    to_state: &str,
) {
    tracing::info!(
        operation = %operation,
        worker_type = %worker_type,
        connection_id = connection_id,
        from_state = %from_state,
        to_state = %to_state,
        timestamp = %Utc::now().to_rfc3339(),
        "CONNECTION_OPERATION"
    );
}
