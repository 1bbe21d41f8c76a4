//! Handler adapters
//!
//! Four handler calling conventions are supported, all normalized into one blocking
//! [`HandlerAdapter::invoke`] contract:
//!
//! | Constructor | Event | Completes through |
//! |-------------|-------|-------------------|
//! | [`HandlerAdapter::typed_deferred`] | `E: Deserialize` | returned future of `R` |
//! | [`HandlerAdapter::typed_callback`] | `E: Deserialize` | [`Completion<R>`] |
//! | [`HandlerAdapter::untyped_deferred`] | [`JsonObject`] | returned future of [`JsonObject`] |
//! | [`HandlerAdapter::untyped_callback`] | [`JsonObject`] | [`Completion<JsonObject>`] |
//!
//! # Example
//!
//! ```ignore
//! use rust_edge_runtime_sdk::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct Event { url: String }
//!
//! #[derive(Serialize)]
//! struct Reply { url: String, length: usize }
//!
//! let adapter = HandlerAdapter::typed_deferred(|event: Event, _ctx: Context| async move {
//!     let body = reqwest::get(&event.url).await.map_err(HandlerError::msg)?
//!         .text().await.map_err(HandlerError::msg)?;
//!     Ok(Reply { url: event.url, length: body.len() })
//! });
//!
//! let callback = HandlerAdapter::untyped_callback(|event, _ctx, completion| {
//!     std::thread::spawn(move || completion.succeed(event));
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{JsonObject, JsonSerializer, Serializer};
use crate::context::Context;
use crate::deferred::{panic_message, Completion, EventLoop};
use crate::error::{HandlerError, INVOCATION_ERROR_TYPE};

/// Outcome of exactly one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationResult {
    /// Encoded response payload
    Success(Bytes),
    /// Reportable failure; `kind` is the `errorType` posted to the control plane
    Failure { message: String, kind: String },
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success(_))
    }
}

impl From<Result<Bytes, HandlerError>> for InvocationResult {
    fn from(result: Result<Bytes, HandlerError>) -> Self {
        match result {
            Ok(bytes) => InvocationResult::Success(bytes),
            Err(err) => InvocationResult::Failure {
                message: err.to_string(),
                kind: INVOCATION_ERROR_TYPE.to_string(),
            },
        }
    }
}

type InvokeFn = dyn Fn(&[u8], &Context, &EventLoop) -> Result<Bytes, HandlerError> + Send + Sync;

/// A user handler wrapped into the uniform invocation contract.
///
/// Cheap to clone; immutable once built.
#[derive(Clone)]
pub struct HandlerAdapter {
    style: HandlerStyle,
    invoke: Arc<InvokeFn>,
}

/// Calling convention an adapter was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStyle {
    TypedDeferred,
    TypedCallback,
    UntypedDeferred,
    UntypedCallback,
}

impl HandlerAdapter {
    /// Decode the event, run the handler on `event_loop` and block until it has
    /// produced a result, then encode it.
    ///
    /// Never panics on behalf of the handler: every decode, handler, bridge and
    /// encode failure comes back as [`InvocationResult::Failure`]. That includes
    /// panics raised by the event's `Deserialize` or the response's `Serialize` impl.
    ///
    /// Blocks the current thread. Calling it from inside an async task is a
    /// programming error and is reported as a failure.
    pub fn invoke(&self, event: &[u8], context: &Context, event_loop: &EventLoop) -> InvocationResult {
        self.try_invoke(event, context, event_loop).into()
    }

    /// Like [`Self::invoke`], but keeps the [`HandlerError`] so callers can
    /// inspect its category before it is flattened into a report.
    pub fn try_invoke(&self, event: &[u8], context: &Context, event_loop: &EventLoop) -> Result<Bytes, HandlerError> {
        panic::catch_unwind(AssertUnwindSafe(|| (self.invoke)(event, context, event_loop)))
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(&*payload))))
    }

    pub fn style(&self) -> HandlerStyle {
        self.style
    }

    /// Handler taking a typed event and returning a future of a typed response
    pub fn typed_deferred<E, R, F, Fut>(handler: F) -> Self
    where
        E: DeserializeOwned + 'static,
        R: Serialize + Send + 'static,
        F: Fn(E, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    {
        Self::typed_deferred_with(JsonSerializer, handler)
    }

    pub fn typed_deferred_with<S, E, R, F, Fut>(serializer: S, handler: F) -> Self
    where
        S: Serializer,
        E: DeserializeOwned + 'static,
        R: Serialize + Send + 'static,
        F: Fn(E, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    {
        Self::new(HandlerStyle::TypedDeferred, move |bytes, ctx, event_loop| {
            let event: E = serializer.decode(bytes)?;
            let future = in_event_loop(event_loop, || handler(event, ctx.clone()));
            let response = event_loop.wait(Box::pin(future))?;
            serializer.encode(&response)
        })
    }

    /// Handler taking a typed event and a completion for the typed response
    pub fn typed_callback<E, R, F>(handler: F) -> Self
    where
        E: DeserializeOwned + 'static,
        R: Serialize + Send + 'static,
        F: Fn(E, Context, Completion<R>) + Send + Sync + 'static,
    {
        Self::typed_callback_with(JsonSerializer, handler)
    }

    pub fn typed_callback_with<S, E, R, F>(serializer: S, handler: F) -> Self
    where
        S: Serializer,
        E: DeserializeOwned + 'static,
        R: Serialize + Send + 'static,
        F: Fn(E, Context, Completion<R>) + Send + Sync + 'static,
    {
        Self::new(HandlerStyle::TypedCallback, move |bytes, ctx, event_loop| {
            let event: E = serializer.decode(bytes)?;
            let (completion, promise) = event_loop.make_promise();
            in_event_loop(event_loop, || handler(event, ctx.clone(), completion));
            let response = promise.wait()?;
            serializer.encode(&response)
        })
    }

    /// Handler taking a generic JSON object and returning a future of one
    pub fn untyped_deferred<F, Fut>(handler: F) -> Self
    where
        F: Fn(JsonObject, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonObject, HandlerError>> + Send + 'static,
    {
        Self::untyped_deferred_with(JsonSerializer, handler)
    }

    pub fn untyped_deferred_with<S, F, Fut>(serializer: S, handler: F) -> Self
    where
        S: Serializer,
        F: Fn(JsonObject, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonObject, HandlerError>> + Send + 'static,
    {
        Self::new(HandlerStyle::UntypedDeferred, move |bytes, ctx, event_loop| {
            let event = serializer.decode_map(bytes)?;
            let future = in_event_loop(event_loop, || handler(event, ctx.clone()));
            let response = event_loop.wait(Box::pin(future))?;
            serializer.encode_map(&response)
        })
    }

    /// Handler taking a generic JSON object and a completion for the response object
    pub fn untyped_callback<F>(handler: F) -> Self
    where
        F: Fn(JsonObject, Context, Completion<JsonObject>) + Send + Sync + 'static,
    {
        Self::untyped_callback_with(JsonSerializer, handler)
    }

    pub fn untyped_callback_with<S, F>(serializer: S, handler: F) -> Self
    where
        S: Serializer,
        F: Fn(JsonObject, Context, Completion<JsonObject>) + Send + Sync + 'static,
    {
        Self::new(HandlerStyle::UntypedCallback, move |bytes, ctx, event_loop| {
            let event = serializer.decode_map(bytes)?;
            let (completion, promise) = event_loop.make_promise();
            in_event_loop(event_loop, || handler(event, ctx.clone(), completion));
            let response = promise.wait()?;
            serializer.encode_map(&response)
        })
    }

    fn new<F>(style: HandlerStyle, invoke: F) -> Self
    where
        F: Fn(&[u8], &Context, &EventLoop) -> Result<Bytes, HandlerError> + Send + Sync + 'static,
    {
        Self { style, invoke: Arc::new(invoke) }
    }
}

impl fmt::Debug for HandlerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerAdapter")
            .field("style", &self.style)
            .finish()
    }
}

/// Run the synchronous part of a user handler inside the pool's context
fn in_event_loop<T>(event_loop: &EventLoop, call: impl FnOnce() -> T) -> T {
    let _entered = event_loop.enter();
    call()
}
