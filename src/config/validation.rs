//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route integrity (unique hosts, parseable upstreams)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;
use axum::http::HeaderName;

use crate::config::schema::ProxyConfig;
use crate::routing::matcher::HostKey;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid listener bind address {0:?}")]
    BindAddress(String),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("TLS is enabled but {0} is empty")]
    TlsPath(&'static str),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("invalid admin bypass header {0:?}")]
    BypassHeader(String),

    #[error("route #{index} has an empty host")]
    EmptyHost { index: usize },

    #[error("host {host:?} is routed more than once")]
    DuplicateHost { host: String },

    #[error("route for {host:?} has no upstream")]
    NoUpstream { host: String },

    #[error("route for {host:?} has invalid upstream {upstream:?} (expected host:port)")]
    InvalidUpstream { host: String, upstream: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::TlsPath("cert_path"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::TlsPath("key_path"));
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    if HeaderName::from_str(&config.admin.bypass_header).is_err() {
        errors.push(ValidationError::BypassHeader(config.admin.bypass_header.clone()));
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost { index });
            continue;
        }
        if !seen.insert(HostKey::new(&route.host)) {
            errors.push(ValidationError::DuplicateHost { host: route.host.clone() });
        }

        let mut any = false;
        for upstream in route.addresses() {
            any = true;
            if !is_upstream_address(upstream) {
                errors.push(ValidationError::InvalidUpstream {
                    host: route.host.clone(),
                    upstream: upstream.to_string(),
                });
            }
        }
        if !any {
            errors.push(ValidationError::NoUpstream { host: route.host.clone() });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` with an explicit port and no userinfo.
pub(crate) fn is_upstream_address(value: &str) -> bool {
    match Authority::from_str(value) {
        Ok(authority) => authority.port_u16().is_some() && !value.contains('@'),
        Err(_) => false,
    }
}
