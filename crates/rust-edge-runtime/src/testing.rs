//! In-process [`HttpClient`] double for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use rust_edge_runtime_sdk::{BoxFuture, EventLoop};
use tokio::runtime::Runtime;

use crate::transport::{HttpClient, HttpRequest, HttpResponse, TransportError};

/// Answers every request with the same canned response and records what it was sent
pub struct MockHttpClient {
    runtime: Mutex<Option<Runtime>>,
    response: Mutex<Option<HttpResponse>>,
    network_error: AtomicBool,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        Self {
            runtime: Mutex::new(Some(runtime)),
            response: Mutex::new(None),
            network_error: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_with(&self, status: u16, headers: &[(&str, &str)], body: Option<&[u8]>) {
        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        *self.response.lock().unwrap() = Some(HttpResponse {
            status,
            headers,
            body: body.map(Bytes::copy_from_slice),
        });
    }

    pub fn fail_with_network_error(&self) {
        self.network_error.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests whose path ends with `suffix`
    pub fn requests_to(&self, suffix: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.path().ends_with(suffix))
            .collect()
    }
}

impl HttpClient for MockHttpClient {
    fn event_loop(&self) -> Result<EventLoop, TransportError> {
        self.runtime
            .lock()
            .unwrap()
            .as_ref()
            .map(|rt| EventLoop::new(rt.handle().clone()))
            .ok_or(TransportError::Shutdown)
    }

    fn execute(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>> {
        self.requests.lock().unwrap().push(request);

        let result = if self.network_error.load(Ordering::SeqCst) {
            Err(TransportError::Connection("Could not connect to the server".into()))
        } else {
            self.response
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| TransportError::Request("no canned response".into()))
        };
        Box::pin(async move { result })
    }

    fn shutdown(&self) -> Result<(), TransportError> {
        match self.runtime.lock().unwrap().take() {
            Some(runtime) => {
                runtime.shutdown_background();
                Ok(())
            }
            None => Err(TransportError::AlreadyShutdown),
        }
    }
}
