//! Runtime configuration

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::transport::{TransportConfig, DEFAULT_TIMEOUT};

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// `host[:port]` of the control plane (`AWS_LAMBDA_RUNTIME_API`)
    pub runtime_api: Option<String>,

    /// Name of the handler to dispatch to (`_HANDLER`)
    pub handler: Option<String>,

    /// Connect and read timeout for every control plane call
    pub timeout: Duration,

    /// Worker threads backing the transport's event loop
    pub worker_threads: usize,
}

impl RuntimeConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let defaults = TransportConfig::default();

        Self {
            runtime_api: vars.get("AWS_LAMBDA_RUNTIME_API").cloned(),

            handler: vars.get("_HANDLER").cloned(),

            timeout: vars
                .get("RUST_EDGE_RUNTIME_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),

            worker_threads: vars
                .get("RUST_EDGE_RUNTIME_WORKER_THREADS")
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.worker_threads),
        }
    }

    /// Transport settings derived from this configuration
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            connect_timeout: self.timeout,
            read_timeout: self.timeout,
            worker_threads: self.worker_threads,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
