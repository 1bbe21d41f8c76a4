//! Runtime API client
//!
//! Implements the poll / respond / report-error protocol against the control plane.
//! Every call is a single attempt over the shared transport: failures are returned to
//! the caller unmodified and nothing is logged here. Retry policy belongs to the caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use rust_edge_runtime_sdk::context::{header, REQUEST_ID_HEADER};
use rust_edge_runtime_sdk::{EventLoop, INIT_ERROR_TYPE, INVOCATION_ERROR_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::endpoints::{RuntimeApiUrls, UrlError};
use crate::transport::{HttpClient, HttpRequest, HttpResponse, TransportError};

/// Errors returned by the runtime API client
#[derive(Error, Debug)]
pub enum RuntimeApiError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),

    #[error("Invalid response status: {0}")]
    InvalidResponseStatus(u16),

    #[error("Invalid response body: no readable body in the next invocation response")]
    InvalidBody,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to encode error report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One event pulled from the control plane
#[derive(Debug, Clone)]
pub struct InvocationEvent {
    /// Raw event payload
    pub body: Bytes,
    /// Response headers, exactly as the transport delivered them
    pub headers: HashMap<String, String>,
}

impl InvocationEvent {
    /// The request id header, if the control plane sent one
    pub fn request_id(&self) -> Option<&str> {
        header(&self.headers, REQUEST_ID_HEADER).map(String::as_str)
    }
}

/// Wire shape of an error report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error_message: String,
    pub error_type: String,
}

impl ErrorReport {
    pub fn new(error: &dyn fmt::Display, error_type: &str) -> Self {
        Self {
            error_message: error.to_string(),
            error_type: error_type.to_string(),
        }
    }
}

/// Statuses accepted from the next invocation call
pub fn is_accepted_status(status: u16) -> bool {
    (200..=206).contains(&status)
}

/// Client for the runtime API
pub struct RuntimeApiClient {
    urls: RuntimeApiUrls,
    client: Arc<dyn HttpClient>,
}

impl RuntimeApiClient {
    /// Create a client for the `host[:port]` runtime API address
    pub fn new(runtime_api: &str, client: Arc<dyn HttpClient>) -> Result<Self, RuntimeApiError> {
        Ok(Self {
            urls: RuntimeApiUrls::new(runtime_api)?,
            client,
        })
    }

    pub fn urls(&self) -> &RuntimeApiUrls {
        &self.urls
    }

    /// Event loop of the underlying transport
    pub fn event_loop(&self) -> Result<EventLoop, RuntimeApiError> {
        Ok(self.client.event_loop()?)
    }

    /// Swap the transport. Taking `&mut self` guarantees no call is in flight.
    /// Returns the previous client so the caller can shut it down.
    pub fn replace_client(&mut self, client: Arc<dyn HttpClient>) -> Arc<dyn HttpClient> {
        std::mem::replace(&mut self.client, client)
    }

    /// Block until the control plane hands out the next event.
    ///
    /// The status is checked before the body, so a rejected status without a body
    /// still reports [`RuntimeApiError::InvalidResponseStatus`].
    pub fn get_next_invocation(&self) -> Result<InvocationEvent, RuntimeApiError> {
        let response = self.send(HttpRequest::get(self.urls.next_invocation()))?;

        if !is_accepted_status(response.status) {
            return Err(RuntimeApiError::InvalidResponseStatus(response.status));
        }

        let HttpResponse { headers, body, .. } = response;
        let body = body.ok_or(RuntimeApiError::InvalidBody)?;
        Ok(InvocationEvent { body, headers })
    }

    /// Send the handler's response bytes verbatim. The response status is not checked.
    pub fn post_invocation_response(&self, request_id: &str, body: Bytes) -> Result<(), RuntimeApiError> {
        self.send(HttpRequest::post(self.urls.invocation_response(request_id), body))?;
        Ok(())
    }

    /// Report a failed invocation with `errorType` `PostInvocationError`
    pub fn post_invocation_error(&self, request_id: &str, error: &dyn fmt::Display) -> Result<(), RuntimeApiError> {
        let report = ErrorReport::new(error, INVOCATION_ERROR_TYPE);
        self.post_report(self.urls.invocation_error(request_id), &report)
    }

    /// Report a failed initialization with `errorType` `InvalidFunctionException`
    pub fn post_initialization_error(&self, error: &dyn fmt::Display) -> Result<(), RuntimeApiError> {
        let report = ErrorReport::new(error, INIT_ERROR_TYPE);
        self.post_report(self.urls.initialization_error(), &report)
    }

    fn post_report(&self, url: Url, report: &ErrorReport) -> Result<(), RuntimeApiError> {
        let body = serde_json::to_vec(report)?;
        self.send(HttpRequest::post(url, body))?;
        Ok(())
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, RuntimeApiError> {
        let event_loop = self.client.event_loop()?;
        Ok(event_loop.block_on(self.client.execute(request))?)
    }
}

impl fmt::Debug for RuntimeApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeApiClient")
            .field("urls", &self.urls)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHttpClient;
    use crate::transport::HttpMethod;

    const REQUEST_ID: &str = "009248902898383-298783789-933098";
    const VALID_DATA: &[u8] = br#"{"dictionary":{"name":"N","value":10},"float":0.9,"string":"Name","int":1}"#;

    #[derive(Debug)]
    enum ErrorMock {
        SomeError,
    }

    impl fmt::Display for ErrorMock {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                ErrorMock::SomeError => write!(f, "someError"),
            }
        }
    }

    fn api(mock: &Arc<MockHttpClient>) -> RuntimeApiClient {
        RuntimeApiClient::new("localhost:80", mock.clone()).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_address() {
        let mock = Arc::new(MockHttpClient::new());
        let err = RuntimeApiClient::new("##", mock).unwrap_err();
        assert!(matches!(err, RuntimeApiError::InvalidUrl(_)));
    }

    #[test]
    fn test_accepted_statuses() {
        for status in 200..=206 {
            assert!(is_accepted_status(status), "{status}");
        }
        for status in [100, 199, 207, 301, 400, 404, 500, 503] {
            assert!(!is_accepted_status(status), "{status}");
        }
    }

    #[test]
    fn test_get_next_invocation_valid_response() {
        for status in 200..=206 {
            let mock = Arc::new(MockHttpClient::new());
            mock.respond_with(status, &[("Accepts", "application/json")], Some(br#"{"a":1}"#));

            let event = api(&mock).get_next_invocation().unwrap();
            assert_eq!(&event.body[..], br#"{"a":1}"#);
            assert_eq!(event.headers.get("Accepts").map(String::as_str), Some("application/json"));

            let requests = mock.requests();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].method, HttpMethod::Get);
            assert_eq!(requests[0].url.path(), "/2018-06-01/runtime/invocation/next");
        }
    }

    #[test]
    fn test_get_next_invocation_invalid_status_precedes_body_check() {
        let mock = Arc::new(MockHttpClient::new());
        mock.respond_with(400, &[("Accepts", "application/json")], None);

        let err = api(&mock).get_next_invocation().unwrap_err();
        assert!(matches!(err, RuntimeApiError::InvalidResponseStatus(400)));
    }

    #[test]
    fn test_get_next_invocation_invalid_status_with_body() {
        let mock = Arc::new(MockHttpClient::new());
        mock.respond_with(500, &[], Some(VALID_DATA));

        let err = api(&mock).get_next_invocation().unwrap_err();
        assert!(matches!(err, RuntimeApiError::InvalidResponseStatus(500)));
    }

    #[test]
    fn test_get_next_invocation_missing_body() {
        let mock = Arc::new(MockHttpClient::new());
        mock.respond_with(200, &[("Accepts", "application/json")], None);

        let err = api(&mock).get_next_invocation().unwrap_err();
        assert!(matches!(err, RuntimeApiError::InvalidBody));
    }

    #[test]
    fn test_get_next_invocation_network_error() {
        let mock = Arc::new(MockHttpClient::new());
        mock.respond_with(200, &[], Some(VALID_DATA));
        mock.fail_with_network_error();

        let err = api(&mock).get_next_invocation().unwrap_err();
        assert!(matches!(err, RuntimeApiError::Transport(TransportError::Connection(_))));
    }

    #[test]
    fn test_request_id_lookup_ignores_case() {
        let event = InvocationEvent {
            body: Bytes::from_static(b"{}"),
            headers: HashMap::from([("lambda-runtime-aws-request-id".to_string(), REQUEST_ID.to_string())]),
        };
        assert_eq!(event.request_id(), Some(REQUEST_ID));
    }

    #[test]
    fn test_post_invocation_response() {
        let mock = Arc::new(MockHttpClient::new());
        mock.respond_with(200, &[], Some(VALID_DATA));

        api(&mock)
            .post_invocation_response(REQUEST_ID, Bytes::from_static(VALID_DATA))
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].url.path(), format!("/2018-06-01/runtime/invocation/{REQUEST_ID}/response"));
        assert_eq!(requests[0].body.as_deref(), Some(VALID_DATA));
    }

    #[test]
    fn test_post_invocation_response_ignores_status() {
        let mock = Arc::new(MockHttpClient::new());
        mock.respond_with(413, &[], None);

        assert!(api(&mock).post_invocation_response(REQUEST_ID, Bytes::new()).is_ok());
    }

    #[test]
    fn test_post_invocation_response_network_error() {
        let mock = Arc::new(MockHttpClient::new());
        mock.respond_with(200, &[], Some(VALID_DATA));
        mock.fail_with_network_error();

        let err = api(&mock)
            .post_invocation_response(REQUEST_ID, Bytes::from_static(VALID_DATA))
            .unwrap_err();
        assert!(matches!(err, RuntimeApiError::Transport(_)));
    }

    #[test]
    fn test_post_invocation_error_report_shape() {
        let mock = Arc::new(MockHttpClient::new());
        mock.respond_with(202, &[], None);

        api(&mock).post_invocation_error(REQUEST_ID, &ErrorMock::SomeError).unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].url.path(), format!("/2018-06-01/runtime/invocation/{REQUEST_ID}/error"));
        let report: serde_json::Value = serde_json::from_slice(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            report,
            serde_json::json!({"errorMessage": "someError", "errorType": "PostInvocationError"})
        );
    }

    #[test]
    fn test_post_invocation_error_network_error() {
        let mock = Arc::new(MockHttpClient::new());
        mock.fail_with_network_error();

        let err = api(&mock).post_invocation_error(REQUEST_ID, &ErrorMock::SomeError).unwrap_err();
        assert!(matches!(err, RuntimeApiError::Transport(_)));
    }

    #[test]
    fn test_post_initialization_error_report_shape() {
        let mock = Arc::new(MockHttpClient::new());
        mock.respond_with(202, &[], None);

        api(&mock).post_initialization_error(&ErrorMock::SomeError).unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].url.path(), "/2018-06-01/runtime/init/error");
        let report: ErrorReport = serde_json::from_slice(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            report,
            ErrorReport {
                error_message: "someError".into(),
                error_type: "InvalidFunctionException".into(),
            }
        );
    }

    #[test]
    fn test_post_initialization_error_network_error() {
        let mock = Arc::new(MockHttpClient::new());
        mock.fail_with_network_error();

        let err = api(&mock).post_initialization_error(&ErrorMock::SomeError).unwrap_err();
        assert!(matches!(err, RuntimeApiError::Transport(_)));
    }

    #[test]
    fn test_replace_client() {
        let first = Arc::new(MockHttpClient::new());
        first.respond_with(400, &[], None);
        let second = Arc::new(MockHttpClient::new());
        second.respond_with(200, &[], Some(b"{}"));

        let mut api = api(&first);
        assert!(api.get_next_invocation().is_err());

        let previous = api.replace_client(second.clone());
        previous.shutdown().unwrap();
        assert!(api.get_next_invocation().is_ok());
        assert_eq!(first.requests().len(), 1);
        assert_eq!(second.requests().len(), 1);
    }
}
