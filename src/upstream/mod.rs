//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Routed request + chosen upstream address
//!     → headers.rs (drop hop-by-hop, set loop guard)
//!     → connector.rs (rewrite URI, connect, await response headers)
//!     → Response<Incoming> streamed back to the dispatcher
//! ```
//!
//! # Design Decisions
//! - One pooled client shared by all requests
//! - Connect failures and slow responses are distinct errors
//! - The response timeout covers headers only; bodies stream unbounded
//! - Upstreams are plaintext HTTP/1.1 (TLS ends at the listener)

pub mod connector;
pub mod headers;

pub use connector::{UpstreamConnector, UpstreamError};
