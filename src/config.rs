//! # Courier Configuration
//!
//! Runtime settings for mailbox loops and wrappers. Values come from defaults,
//! an optional TOML file, and `COURIER_*` environment overrides, in that order.
//!
//! ```rust,no_run
//! use courier_core::config::CourierConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CourierConfig::load(Some(std::path::Path::new("config/courier.toml")))?;
//! println!("loop threads named {}-*", config.thread_name_prefix);
//! # Ok(())
//! # }
//! ```

use crate::error::{CourierError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "COURIER";

/// Upper bound for every configured timeout (24 hours)
pub const MAX_TIMEOUT_MS: u64 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CourierConfig {
    /// Prefix for the names of every thread the crate spawns
    pub thread_name_prefix: String,
    /// How long a connection dispatch waits for a worker's loop to become ready
    pub readiness_timeout_ms: u64,
    /// Default bound for `ServiceWrapper::service_default_timeout`
    pub handle_wait_timeout_ms: u64,
    /// Join the wrapper's loop thread when it is released
    pub join_on_release: bool,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "courier".to_string(),
            readiness_timeout_ms: 5_000,
            handle_wait_timeout_ms: 10_000,
            join_on_release: false,
        }
    }
}

impl CourierConfig {
    /// Load configuration from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading courier configuration file");
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true),
        );

        let config: CourierConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(config = %config.debug_config(), "Courier configuration loaded");
        Ok(config)
    }

    /// Load configuration from the environment only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    pub fn validate(&self) -> Result<()> {
        if self.thread_name_prefix.trim().is_empty() {
            return Err(CourierError::configuration(
                "thread_name_prefix must not be empty",
            ));
        }
        for (field, value) in [
            ("readiness_timeout_ms", self.readiness_timeout_ms),
            ("handle_wait_timeout_ms", self.handle_wait_timeout_ms),
        ] {
            if value == 0 {
                return Err(CourierError::configuration(format!(
                    "{field} must be greater than zero"
                )));
            }
            if value > MAX_TIMEOUT_MS {
                return Err(CourierError::configuration(format!(
                    "{field} must not exceed {MAX_TIMEOUT_MS}ms"
                )));
            }
        }
        Ok(())
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn handle_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.handle_wait_timeout_ms)
    }

    /// JSON view of the effective configuration for logging
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::json!({
            "thread_name_prefix": self.thread_name_prefix,
            "readiness_timeout_ms": self.readiness_timeout_ms,
            "handle_wait_timeout_ms": self.handle_wait_timeout_ms,
            "join_on_release": self.join_on_release,
        })
    }

    /// Build a thread name of the form `<prefix>-<role>`
    pub fn thread_name(&self, role: &str) -> String {
        format!("{}-{}", self.thread_name_prefix, role)
    }
}
