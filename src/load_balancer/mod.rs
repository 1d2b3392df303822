//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → upstream list identified
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through upstreams)
//!     → Return chosen upstream address
//! ```
//!
//! # Design Decisions
//! - Selection state is per route and lock-free (atomic counter)
//! - A route with one upstream never touches the counter
//! - Selection never changes which route a Host resolves to

pub mod round_robin;

pub use round_robin::RoundRobin;

/// Strategy for picking one of a route's upstreams.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Index of the next upstream out of `len`, or `None` when `len == 0`.
    fn next_index(&self, len: usize) -> Option<usize>;

    /// Pick the next item from `items`.
    fn select<'a, T>(&self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        self.next_index(items.len()).and_then(|i| items.get(i))
    }
}
