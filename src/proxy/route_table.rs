use std::collections::HashMap;

use crate::proxy::config::GatewayConfig;

/// Immutable hostname -> upstream mapping, built once at startup and shared
/// read-only across requests.
#[derive(Debug)]
pub struct RouteTable {
    routes: HashMap<String, String>,
    default_registry: String,
    debug: bool,
    target_upstream: String,
}

/// Upstream chosen for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub origin: String,
    /// The reference registry gets namespace normalization (`library/`)
    /// applied to unqualified image names
    pub is_default_registry: bool,
}

impl RouteTable {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            routes: config.routes.clone(),
            default_registry: config.default_registry.clone(),
            debug: config.debug,
            target_upstream: config.target_upstream.clone(),
        }
    }

    /// Exact, case-sensitive hostname lookup. Unmapped hostnames resolve to
    /// the debug fallback target when one is configured, otherwise `None`.
    pub fn resolve(&self, hostname: &str) -> Option<UpstreamTarget> {
        let origin = match self.routes.get(hostname) {
            Some(origin) => origin.clone(),
            None if self.debug && !self.target_upstream.is_empty() => {
                self.target_upstream.clone()
            }
            None => return None,
        };

        let is_default_registry = origin == self.default_registry;
        Some(UpstreamTarget {
            origin,
            is_default_registry,
        })
    }

    /// Full configured mapping, listed in the 404 response body
    pub fn routes(&self) -> &HashMap<String, String> {
        &self.routes
    }
}
