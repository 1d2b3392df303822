//! Failure classification.
//!
//! Every failure the dispatcher can observe becomes a locally generated,
//! well-formed plaintext response. No upstream is involved in producing it.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::upstream::UpstreamError;

/// A request that could not be proxied.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No Host header and no URI authority.
    #[error("Host header not defined")]
    MissingHost,

    /// Host not present in the routing table.
    #[error("no route for host {host:?}")]
    RoutingMiss { host: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ProxyError {
    /// Status code reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingHost | ProxyError::RoutingMiss { .. } => StatusCode::NOT_FOUND,
            ProxyError::Upstream(UpstreamError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Body text reported to the client. Never includes upstream detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::MissingHost => "Host header not defined",
            ProxyError::RoutingMiss { .. } => "No route for host",
            ProxyError::Upstream(UpstreamError::Unreachable { .. }) => "Cannot connect to backend",
            ProxyError::Upstream(UpstreamError::Timeout { .. }) => "Upstream timed out",
            ProxyError::Upstream(_) => "Upstream request failed",
        }
    }

    /// Label used for the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            ProxyError::MissingHost | ProxyError::RoutingMiss { .. } => "not_found",
            ProxyError::Upstream(_) => "upstream_error",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.public_message(),
        )
            .into_response()
    }
}
