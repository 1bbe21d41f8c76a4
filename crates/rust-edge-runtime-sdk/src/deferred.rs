//! Event loop handle and the blocking bridge
//!
//! The invocation loop is synchronous: one event is handled and reported before the
//! next one is requested. Handlers, on the other hand, may be async or may complete
//! through a callback from another thread. This module turns both styles into a
//! blocking wait:
//!
//! - a [`Deferred`] is spawned onto the worker pool and the caller blocks on its task
//! - a callback handler receives a [`Completion`], and the caller blocks on the
//!   matching [`Promise`]
//!
//! # Panics
//!
//! [`EventLoop::block_on`], [`EventLoop::wait`] and [`Promise::wait`] block the
//! current thread and panic when called from inside an async task.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::runtime::{EnterGuard, Handle};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::HandlerError;

/// Type alias for a boxed, sendable future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A value that completes later
pub type Deferred<T> = BoxFuture<'static, Result<T, HandlerError>>;

/// Handle onto the worker pool backing the transport
#[derive(Clone)]
pub struct EventLoop {
    handle: Handle,
}

impl EventLoop {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Enter the pool's context so `tokio::spawn` and friends work on this thread
    pub fn enter(&self) -> EnterGuard<'_> {
        self.handle.enter()
    }

    /// Spawn a task onto the pool
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Block the current thread until `future` completes
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }

    /// Run a deferred value to completion on the pool, blocking until it resolves.
    ///
    /// A panic inside the deferred is reported as [`HandlerError::Panicked`].
    pub fn wait<T: Send + 'static>(&self, deferred: Deferred<T>) -> Result<T, HandlerError> {
        let task = self.spawn(deferred);
        match self.block_on(task) {
            Ok(result) => result,
            Err(err) if err.is_panic() => Err(HandlerError::Panicked(panic_message(&*err.into_panic()))),
            Err(err) => Err(HandlerError::EventLoop(err.to_string())),
        }
    }

    /// Create a fresh single-use promise and the completion that resolves it
    pub fn make_promise<T>(&self) -> (Completion<T>, Promise<T>) {
        let (sender, receiver) = oneshot::channel();
        (
            Completion { sender },
            Promise { receiver, event_loop: self.clone() },
        )
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("flavor", &self.handle.runtime_flavor())
            .finish()
    }
}

/// Resolves a [`Promise`]. Consumed by the first call, so it can fire at most once.
pub struct Completion<T> {
    sender: oneshot::Sender<Result<T, HandlerError>>,
}

impl<T> Completion<T> {
    pub fn complete(self, result: Result<T, HandlerError>) {
        // The waiting side only goes away if the invocation was abandoned
        let _ = self.sender.send(result);
    }

    pub fn succeed(self, value: T) {
        self.complete(Ok(value))
    }

    pub fn fail(self, error: HandlerError) {
        self.complete(Err(error))
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("is_closed", &self.sender.is_closed())
            .finish()
    }
}

/// Blocking side of a [`Completion`]
pub struct Promise<T> {
    receiver: oneshot::Receiver<Result<T, HandlerError>>,
    event_loop: EventLoop,
}

impl<T> Promise<T> {
    /// Block until the completion fires. A completion dropped unfired
    /// resolves to [`HandlerError::CompletionDropped`].
    pub fn wait(self) -> Result<T, HandlerError> {
        let Promise { receiver, event_loop } = self;
        event_loop
            .block_on(receiver)
            .unwrap_or(Err(HandlerError::CompletionDropped))
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
