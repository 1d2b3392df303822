//! Administrative bypass.
//!
//! A request carrying the bypass header with a truthy value is answered by
//! the proxy itself, before any routing. This is the liveness probe for the
//! proxy process; it never contacts an upstream.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Body returned for every bypass request.
pub const STATUS_BODY: &str = "The proxy is running";

/// Default bypass header name.
pub const DEFAULT_BYPASS_HEADER: &str = "x-no-proxy";

/// Short-circuit responder for bypass requests.
#[derive(Debug, Clone)]
pub struct AdminEndpoint {
    header: HeaderName,
    enabled: bool,
}

impl AdminEndpoint {
    pub fn new(header: HeaderName, enabled: bool) -> Self {
        Self { header, enabled }
    }

    /// Whether `headers` carry a truthy bypass marker.
    pub fn is_bypass(&self, headers: &HeaderMap) -> bool {
        self.enabled
            && headers
                .get_all(&self.header)
                .iter()
                .any(|value| is_truthy(value))
    }

    /// The fixed liveness response.
    pub fn respond(&self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            STATUS_BODY,
        )
            .into_response()
    }
}

impl Default for AdminEndpoint {
    fn default() -> Self {
        Self::new(HeaderName::from_static(DEFAULT_BYPASS_HEADER), true)
    }
}

fn is_truthy(value: &HeaderValue) -> bool {
    let Ok(value) = value.to_str() else {
        return false;
    };
    let value = value.trim();
    ["true", "1", "yes", "on"]
        .iter()
        .any(|t| value.eq_ignore_ascii_case(t))
}
