//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::LoadBalancer;

/// Round-robin selector.
/// Stores an internal counter to rotate through upstreams.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_index(&self, len: usize) -> Option<usize> {
        match len {
            0 => None,
            // Single upstream: skip the shared counter entirely.
            1 => Some(0),
            _ => Some(self.counter.fetch_add(1, Ordering::Relaxed) % len),
        }
    }
}
