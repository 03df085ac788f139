use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Origin of the reference registry whose unqualified image names implicitly
/// live under the `library/` namespace.
pub const DOCKER_HUB: &str = "https://registry-1.docker.io";

/// Gateway service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Hostname -> upstream registry origin. Origins are absolute HTTP(S)
    /// origins with no trailing slash; paths are appended by the gateway.
    #[serde(default)]
    pub routes: HashMap<String, String>,

    /// Origin treated as the reference registry (namespace normalization
    /// and legacy redirect behavior apply only to this upstream)
    #[serde(default = "default_registry")]
    pub default_registry: String,

    /// Debug mode: unmapped hostnames fall back to `target_upstream`
    /// instead of a 404, so operators can point the gateway at an
    /// arbitrary registry without editing the route table
    #[serde(default)]
    pub debug: bool,

    /// Fallback upstream used when `debug` is set
    #[serde(default)]
    pub target_upstream: String,

    /// Listen port
    pub port: u16,

    /// Whether to allow LAN access
    /// - false: loopback only, 127.0.0.1 (default)
    /// - true: bind 0.0.0.0
    #[serde(default)]
    pub allow_lan_access: bool,

    /// Outbound request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Egress proxy for upstream calls
    #[serde(default)]
    pub upstream_proxy: UpstreamProxyConfig,
}

/// Egress proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpstreamProxyConfig {
    /// Whether enabled
    pub enabled: bool,
    /// Proxy address (http://, https://, socks5://)
    pub url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            routes: default_routes(),
            default_registry: default_registry(),
            debug: false,
            target_upstream: String::new(),
            port: 8050,
            allow_lan_access: false,
            request_timeout: default_request_timeout(),
            upstream_proxy: UpstreamProxyConfig::default(),
        }
    }
}

fn default_registry() -> String {
    DOCKER_HUB.to_string()
}

fn default_request_timeout() -> u64 {
    600
}

// Stock route table: one subdomain per public registry. Operators replace
// `example.com` with their own edge domain in gateway.json.
fn default_routes() -> HashMap<String, String> {
    HashMap::from([
        ("docker.example.com".to_string(), DOCKER_HUB.to_string()),
        ("quay.example.com".to_string(), "https://quay.io".to_string()),
        ("gcr.example.com".to_string(), "https://gcr.io".to_string()),
        ("k8s-gcr.example.com".to_string(), "https://k8s.gcr.io".to_string()),
        ("k8s.example.com".to_string(), "https://registry.k8s.io".to_string()),
        ("ghcr.example.com".to_string(), "https://ghcr.io".to_string()),
        ("cloudsmith.example.com".to_string(), "https://docker.cloudsmith.io".to_string()),
    ])
}

impl GatewayConfig {
    /// Actual bind address for the listener
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_route_to_known_registries() {
        let config = GatewayConfig::default();
        assert_eq!(
            config.routes.get("docker.example.com").map(String::as_str),
            Some(DOCKER_HUB)
        );
        assert_eq!(config.default_registry, DOCKER_HUB);
        assert!(!config.debug);
        assert_eq!(config.get_bind_address(), "127.0.0.1");
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = GatewayConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.routes, config.routes);
        assert_eq!(parsed.port, config.port);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let parsed: GatewayConfig = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(parsed.port, 9000);
        assert_eq!(parsed.default_registry, DOCKER_HUB);
        assert_eq!(parsed.request_timeout, 600);
        assert!(!parsed.upstream_proxy.enabled);
    }
}
