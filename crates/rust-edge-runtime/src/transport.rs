//! HTTP transport to the control plane
//!
//! A [`Transport`] owns a reqwest client and the tokio worker pool it runs on. The
//! pool doubles as the event loop handed to async handlers. One transport is expected
//! per process; it is created once with a fixed timeout configuration and shut down
//! explicitly at teardown.
//!
//! [`HttpClient`] is the seam the runtime API client talks through, so tests can
//! substitute a mock where the real client sits.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use rust_edge_runtime_sdk::{BoxFuture, EventLoop};
use thiserror::Error;
use tokio::runtime::Runtime;
use url::Url;

/// Default connect and read timeout. The next-invocation call is a long poll.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Errors raised by the transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("Transport has been shut down")]
    Shutdown,

    #[error("Transport is already shut down")]
    AlreadyShutdown,

    #[error("Failed to start event loop: {0}")]
    EventLoop(#[from] std::io::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Number of worker threads in the event loop pool
    pub worker_threads: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            worker_threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self { method: HttpMethod::Get, url, body: None }
    }

    pub fn post(url: Url, body: impl Into<Bytes>) -> Self {
        Self { method: HttpMethod::Post, url, body: Some(body.into()) }
    }
}

/// Response as seen by the runtime API client
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names as delivered by the HTTP stack; a repeated name keeps its last value
    pub headers: HashMap<String, String>,
    /// `None` when the response carried no body bytes
    pub body: Option<Bytes>,
}

/// HTTP client bound to an event loop
pub trait HttpClient: Send + Sync {
    /// Event loop the client's I/O runs on
    fn event_loop(&self) -> Result<EventLoop, TransportError>;

    /// Execute a request. The returned future must be driven on [`Self::event_loop`].
    fn execute(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>>;

    /// Release the client and its event loop. A second call fails with
    /// [`TransportError::AlreadyShutdown`].
    fn shutdown(&self) -> Result<(), TransportError>;
}

/// reqwest + tokio backed [`HttpClient`]
pub struct Transport {
    client: reqwest::Client,
    runtime: Mutex<Option<Runtime>>,
    config: TransportConfig,
}

impl Transport {
    /// Create the client and start its worker pool
    pub fn create(config: TransportConfig) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("edge-runtime-loop")
            .enable_all()
            .build()?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;

        Ok(Self {
            client,
            runtime: Mutex::new(Some(runtime)),
            config,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn is_shutdown(&self) -> bool {
        self.runtime().is_none()
    }

    /// A panic while the lock was held cannot leave the `Option` half-written
    fn runtime(&self) -> MutexGuard<'_, Option<Runtime>> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HttpClient for Transport {
    fn event_loop(&self) -> Result<EventLoop, TransportError> {
        self.runtime()
            .as_ref()
            .map(|rt| EventLoop::new(rt.handle().clone()))
            .ok_or(TransportError::Shutdown)
    }

    fn execute(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>> {
        if self.is_shutdown() {
            return Box::pin(futures::future::ready(Err(TransportError::Shutdown)));
        }

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(request.url),
            HttpMethod::Post => self.client.post(request.url),
        };
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        Box::pin(async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
                })
                .collect();
            let body = response.bytes().await?;

            Ok(HttpResponse {
                status,
                headers,
                body: (!body.is_empty()).then_some(body),
            })
        })
    }

    fn shutdown(&self) -> Result<(), TransportError> {
        let runtime = self.runtime().take();
        match runtime {
            Some(runtime) => {
                runtime.shutdown_timeout(SHUTDOWN_GRACE);
                Ok(())
            }
            None => Err(TransportError::AlreadyShutdown),
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        // Dropping a runtime from inside async code panics; background shutdown does not
        let runtime = self.runtime.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(runtime) = runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("config", &self.config)
            .field("is_shutdown", &self.is_shutdown())
            .finish()
    }
}
