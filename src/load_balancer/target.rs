//! Backend target abstraction.
//!
//! # Responsibilities
//! - Represent a single backend instance by its address string
//! - Resolve the base URL used by the forwarding engine
//! - Release least-connections reservations when a forward completes

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use url::Url;

use crate::error::{RouterError, RouterResult};
use crate::load_balancer::LoadBalancer;

/// A backend address eligible to receive forwarded requests.
///
/// Identity is the address string exactly as registered; `base_url` is
/// derived from it and never compared separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    address: String,
    base_url: Url,
}

impl Target {
    /// Parse a `host:port` pair or an absolute `http(s)` URL.
    pub fn parse(address: &str) -> RouterResult<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(RouterError::InvalidConfiguration(
                "target address must not be empty".to_string(),
            ));
        }

        let candidate = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        let base_url = Url::parse(&candidate).map_err(|e| {
            RouterError::InvalidConfiguration(format!("invalid target '{}': {}", address, e))
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(RouterError::InvalidConfiguration(format!(
                "target '{}' must use http or https",
                address
            )));
        }
        if base_url.host_str().is_none() {
            return Err(RouterError::InvalidConfiguration(format!(
                "target '{}' has no host",
                address
            )));
        }

        Ok(Self {
            address: address.to_string(),
            base_url,
        })
    }

    /// The address string this target was registered with.
    pub fn as_str(&self) -> &str {
        &self.address
    }

    /// Base URL requests are rewritten against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `host[:port]` of the target, used for the outgoing Host header.
    pub fn authority(&self) -> String {
        match (self.base_url.host_str(), self.base_url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => self.address.clone(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.address)
    }
}

/// A RAII guard around a selected target.
///
/// When the selection reserved a connection slot (least-connections with
/// more than one target) the slot is released exactly once on drop, no
/// matter how the forward ended.
#[derive(Debug)]
pub struct ConnectionGuard {
    balancer: Arc<LoadBalancer>,
    target: Target,
    reserved: bool,
    generation: u64,
}

impl ConnectionGuard {
    pub(crate) fn new(
        balancer: Arc<LoadBalancer>,
        target: Target,
        reserved: bool,
        generation: u64,
    ) -> Self {
        Self {
            balancer,
            target,
            reserved,
            generation,
        }
    }

    /// The selected target.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Whether dropping this guard releases a connection slot.
    pub fn is_reserved(&self) -> bool {
        self.reserved
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.reserved {
            self.balancer.release_slot(&self.target, self.generation);
        }
    }
}
