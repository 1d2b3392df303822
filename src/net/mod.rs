//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind)
//!     → tls.rs (optional TLS handshake, rustls)
//!     → Hand off to HTTP layer (same router for both transports)
//! ```
//!
//! # Design Decisions
//! - TLS terminates here; everything above is transport-agnostic
//! - A failed handshake drops only that connection
//! - Each connection is served on its own task

pub mod listener;
pub mod tls;

pub use listener::{bind, ListenerError};
pub use tls::{load_tls_config, TlsError};
