//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Host value
//!     → matcher.rs (normalise into a HostKey)
//!     → table.rs (exact lookup, then port-stripped lookup)
//!     → Return: matched Route or miss
//!
//! Route Compilation (at startup and on reload):
//!     RouteConfig[]
//!     → Parse upstream addresses
//!     → Freeze as immutable RoutingTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable while serving
//! - Reloads replace the whole table, never mutate it
//! - Deterministic: same Host always resolves to the same route
//! - Path and transport never influence the lookup

pub mod matcher;
pub mod table;

pub use matcher::HostKey;
pub use table::{Route, RoutingTable};
