//! Forwarding requests to an upstream address.
//!
//! # Responsibilities
//! - Rewrite the request target onto the chosen upstream
//! - Bound connection establishment and time-to-response-headers separately
//! - Hand the upstream body back unbuffered
//! - Classify failures as unreachable, timed out, or protocol errors

use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, InvalidUriParts, Parts, PathAndQuery, Scheme};
use axum::http::{header, HeaderName, HeaderValue, Request, Response, Uri, Version};
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::{capture_connection, HttpConnector};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::upstream::headers::prepare_request_headers;

type HttpClient = Client<HttpConnector, Body>;

/// Failure to obtain a response from an upstream.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Connection refused, DNS failure, or connect timeout.
    #[error("cannot connect to upstream {upstream}: {source}")]
    Unreachable {
        upstream: Authority,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    /// Connected, but no response headers within the bound.
    #[error("upstream {upstream} did not respond within {after:?}")]
    Timeout { upstream: Authority, after: Duration },

    /// Connection established but the exchange failed.
    #[error("request to upstream {upstream} failed: {source}")]
    Protocol {
        upstream: Authority,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("cannot build upstream URI: {0}")]
    InvalidUri(#[from] InvalidUriParts),
}

impl UpstreamError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Unreachable { .. } => "unreachable",
            UpstreamError::Timeout { .. } => "timeout",
            UpstreamError::Protocol { .. } => "protocol",
            UpstreamError::InvalidUri(_) => "invalid_uri",
        }
    }
}

/// Pooled HTTP/1.1 client for plaintext upstreams.
#[derive(Debug, Clone)]
pub struct UpstreamConnector {
    client: HttpClient,
    response_timeout: Duration,
    loop_guard: Option<HeaderName>,
}

impl UpstreamConnector {
    pub fn new(connect_timeout: Duration, response_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            response_timeout,
            loop_guard: None,
        }
    }

    /// Header set to `true` on every forwarded request.
    pub fn with_loop_guard(mut self, header: HeaderName) -> Self {
        self.loop_guard = Some(header);
        self
    }

    /// Forward `request` to `upstream` and return its response unbuffered.
    ///
    /// Dropping the returned future (client went away) abandons the exchange.
    pub async fn forward(
        &self,
        upstream: &Authority,
        request: Request<Body>,
    ) -> Result<Response<Incoming>, UpstreamError> {
        let (mut parts, body) = request.into_parts();

        // HTTP/2 clients send :authority instead of Host.
        if !parts.headers.contains_key(header::HOST) {
            if let Some(value) = parts
                .uri
                .authority()
                .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
            {
                parts.headers.insert(header::HOST, value);
            }
        }

        parts.uri = upstream_uri(upstream, &parts.uri)?;
        parts.version = Version::HTTP_11;
        prepare_request_headers(&mut parts.headers, self.loop_guard.as_ref());

        let mut request = Request::from_parts(parts, body);
        let mut connection = capture_connection(&mut request);

        let exchange = self.client.request(request);
        tokio::pin!(exchange);

        // Connecting is bounded by the connector alone; the response bound
        // starts once a connection (new or pooled) is attached.
        tokio::select! {
            result = &mut exchange => return classify(upstream, result),
            _ = connection.wait_for_connection_metadata() => {}
        }

        match tokio::time::timeout(self.response_timeout, exchange).await {
            Ok(result) => classify(upstream, result),
            Err(_) => Err(UpstreamError::Timeout {
                upstream: upstream.clone(),
                after: self.response_timeout,
            }),
        }
    }
}

fn classify(
    upstream: &Authority,
    result: Result<Response<Incoming>, hyper_util::client::legacy::Error>,
) -> Result<Response<Incoming>, UpstreamError> {
    match result {
        Ok(response) => Ok(response),
        Err(source) if source.is_connect() => Err(UpstreamError::Unreachable {
            upstream: upstream.clone(),
            source,
        }),
        Err(source) => Err(UpstreamError::Protocol {
            upstream: upstream.clone(),
            source,
        }),
    }
}

/// `http://<upstream><path?query>` from the inbound target.
fn upstream_uri(upstream: &Authority, original: &Uri) -> Result<Uri, InvalidUriParts> {
    let mut parts = Parts::default();
    parts.scheme = Some(Scheme::HTTP);
    parts.authority = Some(upstream.clone());
    parts.path_and_query = Some(
        original
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/")),
    );
    Uri::from_parts(parts)
}
