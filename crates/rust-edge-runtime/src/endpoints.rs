//! Control plane endpoint URLs

use thiserror::Error;
use url::Url;

const API_VERSION: &str = "2018-06-01";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Invalid runtime API address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// Builds the runtime API URLs from the `host[:port]` address the control plane
/// publishes (`AWS_LAMBDA_RUNTIME_API`).
#[derive(Debug, Clone)]
pub struct RuntimeApiUrls {
    base: Url,
}

impl RuntimeApiUrls {
    pub fn new(runtime_api: &str) -> Result<Self, UrlError> {
        let invalid = |reason: &str| UrlError::InvalidAddress {
            address: runtime_api.to_string(),
            reason: reason.to_string(),
        };

        if runtime_api.trim().is_empty() {
            return Err(invalid("address is empty"));
        }

        let base = Url::parse(&format!("http://{runtime_api}")).map_err(|e| invalid(&e.to_string()))?;
        if base.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host"));
        }
        if base.path() != "/" || base.query().is_some() || base.fragment().is_some() {
            return Err(invalid("expected host[:port] only"));
        }

        Ok(Self { base })
    }

    /// `GET /2018-06-01/runtime/invocation/next`
    pub fn next_invocation(&self) -> Url {
        self.join(&["runtime", "invocation", "next"])
    }

    /// `POST /2018-06-01/runtime/invocation/{requestId}/response`
    pub fn invocation_response(&self, request_id: &str) -> Url {
        self.join(&["runtime", "invocation", request_id, "response"])
    }

    /// `POST /2018-06-01/runtime/invocation/{requestId}/error`
    pub fn invocation_error(&self, request_id: &str) -> Url {
        self.join(&["runtime", "invocation", request_id, "error"])
    }

    /// `POST /2018-06-01/runtime/init/error`
    pub fn initialization_error(&self) -> Url {
        self.join(&["runtime", "init", "error"])
    }

    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `base` is validated as an http URL with a host, so it can always be a base
        if let Ok(mut path) = url.path_segments_mut() {
            path.clear().push(API_VERSION).extend(segments);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        let urls = RuntimeApiUrls::new("localhost:80").unwrap();
        let request_id = "009248902898383-298783789-933098";

        assert_eq!(urls.next_invocation().as_str(), "http://localhost/2018-06-01/runtime/invocation/next");
        assert_eq!(
            urls.invocation_response(request_id).as_str(),
            "http://localhost/2018-06-01/runtime/invocation/009248902898383-298783789-933098/response"
        );
        assert_eq!(
            urls.invocation_error(request_id).as_str(),
            "http://localhost/2018-06-01/runtime/invocation/009248902898383-298783789-933098/error"
        );
        assert_eq!(urls.initialization_error().as_str(), "http://localhost/2018-06-01/runtime/init/error");
    }

    #[test]
    fn test_non_default_port_is_kept() {
        let urls = RuntimeApiUrls::new("127.0.0.1:9001").unwrap();
        assert_eq!(urls.next_invocation().as_str(), "http://127.0.0.1:9001/2018-06-01/runtime/invocation/next");
    }

    #[test]
    fn test_request_id_is_a_single_segment() {
        let urls = RuntimeApiUrls::new("localhost:9001").unwrap();
        let url = urls.invocation_error("a/b");
        assert_eq!(url.path(), "/2018-06-01/runtime/invocation/a%2Fb/error");
    }

    #[test]
    fn test_malformed_addresses() {
        assert!(RuntimeApiUrls::new("##").is_err());
        assert!(RuntimeApiUrls::new("").is_err());
        assert!(RuntimeApiUrls::new("localhost:80/extra").is_err());
        assert!(RuntimeApiUrls::new("localhost:notaport").is_err());
    }
}
