//! Host key normalisation.
//!
//! # Responsibilities
//! - Turn a configured host pattern or an inbound Host value into a lookup key
//! - Provide the port-stripped fallback key for `name:port` Host values
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110 §4.2.3)
//! - Surrounding whitespace and a trailing root dot are ignored
//! - No wildcards or regex: lookups stay a single hash probe

use std::fmt;

/// Normalised host used as a routing key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey(String);

impl HostKey {
    /// Build a key from a host pattern or Host header value.
    pub fn new(host: &str) -> Self {
        let trimmed = host.trim();
        let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
        Self(trimmed.to_ascii_lowercase())
    }

    /// The key with any `:port` suffix removed, if there was one.
    ///
    /// Bracketed IPv6 literals keep their brackets: `[::1]:80` → `[::1]`.
    pub fn without_port(&self) -> Option<HostKey> {
        let (name, port) = self.0.rsplit_once(':')?;
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Unbracketed IPv6 has colons but no port.
        if name.contains(':') && !name.ends_with(']') {
            return None;
        }
        let name = name.strip_suffix('.').unwrap_or(name);
        Some(HostKey(name.to_string()))
    }

    /// The normalised key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
