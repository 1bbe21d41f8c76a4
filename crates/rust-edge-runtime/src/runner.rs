//! Invocation loop
//!
//! Pulls one event at a time from the control plane, dispatches it to the configured
//! handler and reports exactly one outcome (response or error) before asking for the
//! next event. Control plane failures end the loop; there is no retry or backoff.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rust_edge_runtime_sdk::{Context, HandlerAdapter, InvocationResult};
use thiserror::Error;

use crate::api::{RuntimeApiClient, RuntimeApiError};
use crate::registry::HandlerRegistry;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Handler not registered: {0}")]
    HandlerNotFound(String),

    #[error("Next invocation response carried no request id")]
    MissingRequestId,

    #[error(transparent)]
    Api(#[from] RuntimeApiError),
}

/// What happened to one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The handler's response was posted
    Responded { request_id: String },
    /// An invocation error was posted
    Failed { request_id: String, message: String },
}

/// Orchestrates the poll / dispatch / report cycle for one handler
pub struct Runner {
    api: RuntimeApiClient,
    registry: HandlerRegistry,
    handler: String,
    environment: HashMap<String, String>,
}

impl Runner {
    pub fn new(
        api: RuntimeApiClient,
        registry: HandlerRegistry,
        handler: impl Into<String>,
        environment: HashMap<String, String>,
    ) -> Self {
        Self {
            api,
            registry,
            handler: handler.into(),
            environment,
        }
    }

    pub fn api(&self) -> &RuntimeApiClient {
        &self.api
    }

    /// Swap-capable access to the client; only reachable while no invocation runs
    pub fn api_mut(&mut self) -> &mut RuntimeApiClient {
        &mut self.api
    }

    /// Resolve the configured handler. When it is missing, reports one
    /// initialization error to the control plane.
    pub fn init(&self) -> Result<Arc<HandlerAdapter>, RunnerError> {
        match self.registry.get(&self.handler) {
            Some(adapter) => {
                tracing::info!(handler = %self.handler, style = ?adapter.style(), "Handler resolved");
                Ok(adapter)
            }
            None => {
                let err = RunnerError::HandlerNotFound(self.handler.clone());
                tracing::error!(
                    handler = %self.handler,
                    registered = ?self.registry.names(),
                    "Handler not registered, reporting initialization error"
                );
                self.api.post_initialization_error(&err)?;
                Err(err)
            }
        }
    }

    /// Fetch, handle and report a single invocation
    pub fn process_next(&self, adapter: &HandlerAdapter) -> Result<InvocationOutcome, RunnerError> {
        let event = self.api.get_next_invocation()?;
        let request_id = event
            .request_id()
            .ok_or(RunnerError::MissingRequestId)?
            .to_string();

        let span = tracing::info_span!("invocation", request_id = %request_id, handler = %self.handler);
        let _entered = span.enter();

        let context = match Context::new(&self.environment, &event.headers) {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!(error = %err, "Invalid invocation metadata");
                self.api.post_invocation_error(&request_id, &err)?;
                return Ok(InvocationOutcome::Failed { request_id, message: err.to_string() });
            }
        };

        let event_loop = self.api.event_loop()?;
        let started = Instant::now();
        let result = adapter.try_invoke(&event.body, &context, &event_loop);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if let Err(err) = &result {
            tracing::warn!(elapsed_ms, cause = err.kind(), error = %err, "Invocation failed");
        }

        match InvocationResult::from(result) {
            InvocationResult::Success(body) => {
                tracing::debug!(elapsed_ms, bytes = body.len(), "Invocation succeeded");
                self.api.post_invocation_response(&request_id, body)?;
                Ok(InvocationOutcome::Responded { request_id })
            }
            InvocationResult::Failure { message, .. } => {
                self.api.post_invocation_error(&request_id, &message)?;
                Ok(InvocationOutcome::Failed { request_id, message })
            }
        }
    }

    /// Resolve the handler, then process invocations until the control plane fails
    pub fn run(&self) -> Result<(), RunnerError> {
        let adapter = self.init()?;
        loop {
            if let Err(err) = self.process_next(&adapter) {
                tracing::error!(error = %err, "Invocation loop stopped");
                return Err(err);
            }
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("handler", &self.handler)
            .field("api", &self.api)
            .field("registry", &self.registry)
            .finish()
    }
}
