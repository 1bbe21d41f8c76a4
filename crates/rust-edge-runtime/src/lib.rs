//! Rust Edge Runtime
//!
//! The process side of a custom function runtime:
//! - [`transport`]: the shared HTTP client and its event loop
//! - [`api`]: the runtime API client (next invocation, response, error reports)
//! - [`registry`]: named handler adapters
//! - [`runner`]: the sequential poll / dispatch / report loop
//!
//! Handler authors only need the SDK crate, re-exported here as [`sdk`].

pub mod api;
pub mod config;
pub mod endpoints;
pub mod registry;
pub mod runner;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use rust_edge_runtime_sdk as sdk;

pub use api::{ErrorReport, InvocationEvent, RuntimeApiClient, RuntimeApiError};
pub use config::RuntimeConfig;
pub use registry::{HandlerRegistry, RegistryError};
pub use runner::{InvocationOutcome, Runner, RunnerError};
pub use transport::{HttpClient, Transport, TransportConfig, TransportError};
