//! Request header preparation for forwarding.
//!
//! Only hop-by-hop headers are removed; everything end-to-end is replayed
//! untouched. Response headers are never filtered.

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

/// Connection-scoped headers that must not be forwarded (RFC 9110 §7.6.1).
#[allow(clippy::declare_interior_mutable_const)]
pub const HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Strip hop-by-hop headers and mark the request with the loop guard header.
pub fn prepare_request_headers(headers: &mut HeaderMap, loop_guard: Option<&HeaderName>) {
    // Headers nominated by `Connection` are hop-by-hop too.
    let nominated: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in nominated.iter().chain(HOP_BY_HOP_HEADERS.iter()) {
        headers.remove(name);
    }

    if let Some(name) = loop_guard {
        headers.insert(name.clone(), HeaderValue::from_static("true"));
    }
}
