//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID + trace layers)
//!     → dispatcher.rs (bypass check → route lookup → forward → relay)
//!         → admin.rs (bypass responder)
//!         → error.rs (failure → status code)
//!     → Send to client
//! ```

pub mod admin;
pub mod dispatcher;
pub mod error;
pub mod request;
pub mod server;

pub use admin::AdminEndpoint;
pub use error::ProxyError;
pub use request::{request_id_layer, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};
