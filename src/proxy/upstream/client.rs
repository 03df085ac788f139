// Upstream client implementation
// Shared HTTP client for probes, token fetches and pass-through forwarding

use reqwest::{header, Client, Method, Response};
use reqwest::header::{HeaderMap, HeaderValue};
use tokio::time::Duration;
use url::Url;

use crate::proxy::auth::AuthChallenge;
use crate::proxy::config::GatewayConfig;

pub struct UpstreamClient {
    http_client: Client,
}

impl UpstreamClient {
    pub fn new(config: &GatewayConfig) -> Self {
        let mut builder = Client::builder()
            // Connection settings (optimize connection reuse, reduce overhead)
            .connect_timeout(Duration::from_secs(20))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(config.request_timeout));

        let egress = &config.upstream_proxy;
        if egress.enabled && !egress.url.is_empty() {
            if let Ok(proxy) = reqwest::Proxy::all(&egress.url) {
                builder = builder.proxy(proxy);
                tracing::info!("UpstreamClient enabled egress proxy: {}", egress.url);
            }
        } else {
            builder = builder.no_proxy();
        }

        let http_client = builder.build().expect("Failed to create HTTP client");

        Self { http_client }
    }

    /// GET `<upstream>/v2/`, forwarding only the given Authorization value.
    /// Used both for the root probe and for discovering the real token
    /// service behind `/v2/auth`.
    pub async fn probe_v2(
        &self,
        upstream: &str,
        authorization: Option<&HeaderValue>,
    ) -> Result<Response, String> {
        let url = format!("{}/v2/", upstream);
        let mut request = self.http_client.get(&url);
        if let Some(auth) = authorization {
            request = request.header(header::AUTHORIZATION, auth);
        }

        request
            .send()
            .await
            .map_err(|e| format!("Probe of {} failed: {}", url, e))
    }

    /// Fetch a token from the upstream's authentication realm, relaying the
    /// client's credentials verbatim. The response is returned raw; the
    /// token payload is never interpreted here.
    pub async fn fetch_token(
        &self,
        challenge: &AuthChallenge,
        scope: Option<&str>,
        authorization: Option<&HeaderValue>,
    ) -> Result<Response, String> {
        let url = build_token_url(challenge, scope)?;
        let mut request = self.http_client.get(url);
        if let Some(auth) = authorization {
            request = request.header(header::AUTHORIZATION, auth);
        }

        request
            .send()
            .await
            .map_err(|e| format!("Token request to {} failed: {}", challenge.realm, e))
    }

    /// Forward a request byte-for-byte to the upstream. Headers pass through
    /// except Host (the upstream gets its own) and hop-by-hop transport
    /// headers; the body streams without buffering.
    pub async fn forward(
        &self,
        url: &str,
        method: Method,
        mut headers: HeaderMap,
        body: reqwest::Body,
    ) -> Result<Response, String> {
        headers.remove(header::HOST);
        headers.remove(header::CONNECTION);
        headers.remove(header::TRANSFER_ENCODING);

        self.http_client
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| format!("Forward to {} failed: {}", url, e))
    }
}

/// Build the token URL: `realm?service=...&scope=...`, omitting each query
/// parameter the challenge or the client did not supply.
fn build_token_url(challenge: &AuthChallenge, scope: Option<&str>) -> Result<String, String> {
    let mut url = Url::parse(&challenge.realm)
        .map_err(|e| format!("Invalid token realm {}: {}", challenge.realm, e))?;

    if !challenge.service.is_empty() {
        url.query_pairs_mut().append_pair("service", &challenge.service);
    }
    if let Some(scope) = scope {
        url.query_pairs_mut().append_pair("scope", scope);
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(realm: &str, service: &str) -> AuthChallenge {
        AuthChallenge {
            realm: realm.to_string(),
            service: service.to_string(),
        }
    }

    #[test]
    fn test_build_token_url_with_service_and_scope() {
        let url = build_token_url(
            &challenge("https://auth.example/token", "registry.example"),
            Some("repository:library/busybox:pull"),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://auth.example/token?service=registry.example&scope=repository%3Alibrary%2Fbusybox%3Apull"
        );
    }

    #[test]
    fn test_build_token_url_without_scope() {
        let url = build_token_url(
            &challenge("https://auth.example/token", "registry.example"),
            None,
        )
        .unwrap();
        assert_eq!(url, "https://auth.example/token?service=registry.example");
    }

    #[test]
    fn test_build_token_url_omits_empty_service() {
        let url = build_token_url(
            &challenge("https://auth.example/token", ""),
            Some("repository:busybox:pull"),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://auth.example/token?scope=repository%3Abusybox%3Apull"
        );
    }

    #[test]
    fn test_build_token_url_rejects_relative_realm() {
        assert!(build_token_url(&challenge("/token", "svc"), None).is_err());
    }
}
