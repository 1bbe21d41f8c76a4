//! Rust Edge Runtime SDK - Types and utilities for writing function handlers
//!
//! This crate provides the handler-facing half of the runtime: the payload
//! serializer, the invocation context, the event loop bridge and the adapters that
//! turn user functions into the uniform blocking invocation contract.

pub mod codec;
pub mod context;
pub mod deferred;
pub mod error;
pub mod handler;

pub mod prelude {
    //! Common imports for Rust Edge Runtime handlers
    pub use crate::codec::{JsonObject, JsonSerializer, Serializer};
    pub use crate::context::Context;
    pub use crate::deferred::{Completion, Deferred, EventLoop};
    pub use crate::error::HandlerError;
    pub use crate::handler::{HandlerAdapter, InvocationResult};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{json, Value as JsonValue};
}

// Re-export key types at crate root
pub use codec::{JsonObject, JsonSerializer, Serializer};
pub use context::{Context, ContextError};
pub use deferred::{BoxFuture, Completion, Deferred, EventLoop, Promise};
pub use error::{HandlerError, INIT_ERROR_TYPE, INVOCATION_ERROR_TYPE};
pub use handler::{HandlerAdapter, HandlerStyle, InvocationResult};
