//! Per-invocation context handed to every handler
//!
//! Built from the process environment (function metadata) and the response headers
//! of the "next invocation" call (request metadata).

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
pub const DEADLINE_HEADER: &str = "Lambda-Runtime-Deadline-Ms";
pub const FUNCTION_ARN_HEADER: &str = "Lambda-Runtime-Invoked-Function-Arn";
pub const TRACE_ID_HEADER: &str = "Lambda-Runtime-Trace-Id";
pub const CLIENT_CONTEXT_HEADER: &str = "Lambda-Runtime-Client-Context";
pub const COGNITO_IDENTITY_HEADER: &str = "Lambda-Runtime-Cognito-Identity";

/// Errors raised while building a [`Context`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid deadline: {0}")]
    InvalidDeadline(String),
}

/// Context passed to every handler
#[derive(Debug, Clone)]
pub struct Context {
    pub function_name: Option<String>,
    pub function_version: Option<String>,
    pub memory_limit_mb: Option<u32>,
    pub log_group_name: Option<String>,
    pub log_stream_name: Option<String>,

    /// Request id assigned by the control plane
    pub request_id: String,
    /// Point in time after which the invocation is abandoned
    pub deadline: DateTime<Utc>,
    pub invoked_function_arn: Option<String>,
    pub trace_id: Option<String>,
    pub client_context: Option<String>,
    pub cognito_identity: Option<String>,
}

impl Context {
    /// Create a context from the environment and the invocation's response headers
    pub fn new(
        environment: &HashMap<String, String>,
        headers: &HashMap<String, String>,
    ) -> Result<Self, ContextError> {
        let request_id = header(headers, REQUEST_ID_HEADER)
            .ok_or(ContextError::MissingHeader(REQUEST_ID_HEADER))?
            .clone();

        let deadline_raw = header(headers, DEADLINE_HEADER)
            .ok_or(ContextError::MissingHeader(DEADLINE_HEADER))?;
        let deadline = deadline_raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| ContextError::InvalidDeadline(deadline_raw.clone()))?;

        Ok(Self {
            function_name: environment.get("AWS_LAMBDA_FUNCTION_NAME").cloned(),
            function_version: environment.get("AWS_LAMBDA_FUNCTION_VERSION").cloned(),
            memory_limit_mb: environment
                .get("AWS_LAMBDA_FUNCTION_MEMORY_SIZE")
                .and_then(|s| s.parse().ok()),
            log_group_name: environment.get("AWS_LAMBDA_LOG_GROUP_NAME").cloned(),
            log_stream_name: environment.get("AWS_LAMBDA_LOG_STREAM_NAME").cloned(),
            request_id,
            deadline,
            invoked_function_arn: header(headers, FUNCTION_ARN_HEADER).cloned(),
            trace_id: header(headers, TRACE_ID_HEADER).cloned(),
            client_context: header(headers, CLIENT_CONTEXT_HEADER).cloned(),
            cognito_identity: header(headers, COGNITO_IDENTITY_HEADER).cloned(),
        })
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining_time(&self) -> Duration {
        (self.deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Case-insensitive header lookup.
///
/// Header names arrive exactly as the transport delivered them, so callers must not
/// assume any particular casing.
pub fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a String> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}
