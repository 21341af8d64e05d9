//! # Courier Error Types
//!
//! Structured errors for the infrastructure paths of the crate. Message delivery
//! is best-effort and never produces an error value; only construction, waiting
//! and configuration can fail.

use thiserror::Error;

/// Errors surfaced by mailbox loops, published handles and wrappers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CourierError {
    #[error("Bind failed: connection to worker '{target}' was rejected")]
    BindFailure { target: String },

    #[error("Thread spawn failed for '{name}': {message}")]
    ThreadSpawn { name: String, message: String },

    #[error("Wait interrupted: {operation}")]
    InterruptedWait { operation: String },

    #[error("Wait timed out: {operation} after {timeout_ms}ms")]
    WaitTimeout { operation: String, timeout_ms: u64 },

    #[error("Handle already published")]
    AlreadyPublished,

    #[error("Handle closed before a value was published")]
    HandleClosed,

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CourierError {
    /// Create a bind failure for the given worker type
    pub fn bind_failure(target: impl Into<String>) -> Self {
        Self::BindFailure {
            target: target.into(),
        }
    }

    /// Create a thread spawn error
    pub fn thread_spawn(name: impl Into<String>, err: &std::io::Error) -> Self {
        Self::ThreadSpawn {
            name: name.into(),
            message: err.to_string(),
        }
    }

    /// Create an interrupted wait error
    pub fn interrupted(operation: impl Into<String>) -> Self {
        Self::InterruptedWait {
            operation: operation.into(),
        }
    }

    /// Create a wait timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::WaitTimeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the error came from an aborted or expired wait
    pub fn is_wait_failure(&self) -> bool {
        matches!(
            self,
            Self::InterruptedWait { .. } | Self::WaitTimeout { .. } | Self::HandleClosed
        )
    }
}

impl From<::config::ConfigError> for CourierError {
    fn from(err: ::config::ConfigError) -> Self {
        CourierError::configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CourierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let bind = CourierError::bind_failure("Clock");
        assert!(matches!(bind, CourierError::BindFailure { .. }));

        let timeout = CourierError::timeout("service handle", 250);
        assert!(timeout.is_wait_failure());
        assert!(CourierError::interrupted("mailbox").is_wait_failure());
        assert!(!CourierError::AlreadyPublished.is_wait_failure());
    }

    #[test]
    fn test_error_display() {
        let err = CourierError::bind_failure("clock::Clock");
        let display_str = format!("{err}");
        assert!(display_str.contains("Bind failed"));
        assert!(display_str.contains("clock::Clock"));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "no threads left");
        let err = CourierError::thread_spawn("courier-loop", &io);
        let display_str = format!("{err}");
        assert!(display_str.contains("courier-loop"));
        assert!(display_str.contains("no threads left"));
    }
}
