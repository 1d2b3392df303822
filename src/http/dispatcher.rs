//! Per-request control flow.
//!
//! # States
//! ```text
//! Accepted → BypassCheck ─┬─ bypass ──→ AdminResponse
//!                         └─ routable → RouteLookup ─┬─ miss → NotFoundResponse
//!                                                    └─ hit ──→ Forwarding ─┬─ error → ErrorResponse
//!                                                                           └─ ok ────→ Relaying → Done
//! ```
//!
//! # Design Decisions
//! - Bypass is evaluated first, before Host is even read
//! - The routing snapshot is released before any upstream I/O
//! - Exactly one terminal outcome per request
//! - The upstream response is relayed as-is: status, headers, streamed body

use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, uri::Authority, Request},
    response::Response,
};
use hyper::body::Incoming;
use std::net::SocketAddr;

use crate::http::error::ProxyError;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Terminal state of a request.
pub enum Outcome {
    /// Answered by the administrative endpoint.
    Admin(Response),
    /// Relayed from an upstream.
    Proxied(Response),
    /// Synthesised error response.
    Failed(ProxyError),
}

impl Outcome {
    /// Label used for the `outcome` metric dimension.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Admin(_) => "admin",
            Outcome::Proxied(_) => "proxied",
            Outcome::Failed(err) => err.outcome(),
        }
    }

    pub fn into_response(self) -> Response {
        match self {
            Outcome::Admin(response) | Outcome::Proxied(response) => response,
            Outcome::Failed(err) => axum::response::IntoResponse::into_response(err),
        }
    }
}

/// Axum fallback handler: every method, every path.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        peer = ?peer,
        "Dispatching request"
    );

    let outcome = dispatch(&state, request).await;
    let label = outcome.label();

    if let Outcome::Failed(err) = &outcome {
        match err {
            ProxyError::Upstream(upstream) => {
                metrics::record_upstream_error(upstream.kind());
                tracing::error!(request_id = %request_id, error = %err, kind = upstream.kind(), "Upstream error");
            }
            _ => tracing::warn!(request_id = %request_id, path = %path, error = %err, "No route matched"),
        }
    }

    let response = outcome.into_response();
    metrics::record_request(method.as_str(), response.status().as_u16(), label, start);
    response
}

/// Run one request through the state machine.
pub async fn dispatch(state: &AppState, request: Request<Body>) -> Outcome {
    // BypassCheck
    if state.admin.is_bypass(request.headers()) {
        tracing::debug!("Bypass header present, answering locally");
        return Outcome::Admin(state.admin.respond());
    }

    // RouteLookup
    let upstream = match lookup(state, &request) {
        Ok(upstream) => upstream,
        Err(err) => return Outcome::Failed(err),
    };

    // Forwarding
    match state.connector.forward(&upstream, request).await {
        // Relaying
        Ok(response) => {
            tracing::info!(upstream = %upstream, status = %response.status(), "Proxied response");
            Outcome::Proxied(relay(response))
        }
        Err(err) => Outcome::Failed(err.into()),
    }
}

fn lookup(state: &AppState, request: &Request<Body>) -> Result<Authority, ProxyError> {
    let host = inbound_host(request).ok_or(ProxyError::MissingHost)?;
    let routes = state.routes.load();
    routes
        .resolve(host)
        .and_then(|route| route.select_upstream())
        .cloned()
        .ok_or_else(|| ProxyError::RoutingMiss { host: host.to_string() })
}

/// Host header, or the URI authority for HTTP/2 requests.
fn inbound_host(request: &Request<Body>) -> Option<&str> {
    match request.headers().get(header::HOST) {
        Some(value) => value.to_str().ok(),
        None => request.uri().authority().map(Authority::as_str),
    }
}

fn relay(response: Response<Incoming>) -> Response {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}
