//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes keyed by normalised host
//! - Resolve an inbound Host value to a route or an explicit miss
//! - Pick an upstream within a route
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - O(1) host lookup via HashMap, at most two probes (exact, then port-stripped)
//! - Explicit miss rather than silent default

use std::collections::HashMap;
use std::str::FromStr;

use axum::http::uri::Authority;

use crate::config::RouteConfig;
use crate::load_balancer::{LoadBalancer, RoundRobin};
use crate::routing::matcher::HostKey;

/// A virtual host and its upstream addresses.
#[derive(Debug)]
pub struct Route {
    host: String,
    upstreams: Vec<Authority>,
    balancer: RoundRobin,
}

impl Route {
    /// Host pattern as written in configuration.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Next upstream for this route (round-robin across `upstreams`).
    pub fn select_upstream(&self) -> Option<&Authority> {
        self.balancer.select(&self.upstreams)
    }
}

/// Immutable mapping from virtual host to route.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: HashMap<HostKey, Route>,
}

impl RoutingTable {
    /// Compile routes from configuration.
    ///
    /// Unparseable upstreams and duplicate hosts are skipped with a warning;
    /// validated configs never contain either.
    pub fn from_config(configs: &[RouteConfig]) -> Self {
        let mut routes = HashMap::with_capacity(configs.len());

        for config in configs {
            let upstreams: Vec<Authority> = config
                .addresses()
                .filter_map(|addr| match Authority::from_str(addr) {
                    Ok(authority) => Some(authority),
                    Err(_) => {
                        tracing::warn!(host = %config.host, upstream = %addr, "Invalid upstream address");
                        None
                    }
                })
                .collect();

            if upstreams.is_empty() {
                tracing::warn!(host = %config.host, "Route has no usable upstream, skipping");
                continue;
            }

            let key = HostKey::new(&config.host);
            if routes.contains_key(&key) {
                tracing::warn!(host = %config.host, "Duplicate route host, keeping the first");
                continue;
            }

            routes.insert(
                key,
                Route {
                    host: config.host.clone(),
                    upstreams,
                    balancer: RoundRobin::new(),
                },
            );
        }

        Self { routes }
    }

    /// Resolve a Host header value.
    ///
    /// Tries the full value first, then the value without its port.
    pub fn resolve(&self, host: &str) -> Option<&Route> {
        let key = HostKey::new(host);
        self.routes
            .get(&key)
            .or_else(|| key.without_port().and_then(|bare| self.routes.get(&bare)))
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
