//! Error types for Rust Edge Runtime handlers

use thiserror::Error;

/// `errorType` reported to the control plane when an invocation fails
pub const INVOCATION_ERROR_TYPE: &str = "PostInvocationError";

/// `errorType` reported to the control plane when initialization fails
pub const INIT_ERROR_TYPE: &str = "InvalidFunctionException";

/// Errors that can occur while handling one invocation
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("{0}")]
    Failed(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),

    #[error("Handler dropped its completion without reporting a result")]
    CompletionDropped,

    #[error("Event loop unavailable: {0}")]
    EventLoop(String),
}

impl HandlerError {
    /// Build a handler failure from any displayable error.
    ///
    /// # Example
    /// ```ignore
    /// let url = event.get("url").ok_or_else(|| HandlerError::msg("missing url"))?;
    /// ```
    pub fn msg(message: impl std::fmt::Display) -> Self {
        HandlerError::Failed(message.to_string())
    }

    /// Short machine-readable category, logged next to each reported failure
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerError::Decode(_) => "DecodeError",
            HandlerError::Encode(_) => "EncodeError",
            HandlerError::Failed(_) | HandlerError::Panicked(_) | HandlerError::CompletionDropped => {
                "HandlerError"
            }
            HandlerError::EventLoop(_) => "EventLoopError",
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_displays_message_verbatim() {
        let err = HandlerError::msg("invalid parameters");
        assert_eq!(err.to_string(), "invalid parameters");
        assert_eq!(err.kind(), "HandlerError");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(HandlerError::Decode("x".into()).kind(), "DecodeError");
        assert_eq!(HandlerError::Encode("x".into()).kind(), "EncodeError");
        assert_eq!(HandlerError::CompletionDropped.kind(), "HandlerError");
    }
}
