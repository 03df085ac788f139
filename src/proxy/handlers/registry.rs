// Registry gateway dispatch
// Branch order per request: docs page, route miss, /v2/ probe rewrite,
// /v2/auth token relay, legacy name redirect, pass-through.

use axum::{
    body::Body,
    extract::{Host, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::proxy::auth;
use crate::proxy::docs::DOCS;
use crate::proxy::route_table::RouteTable;
use crate::proxy::server::AppState;

/// Service identifier the gateway advertises in its own bearer challenge.
/// Clients echo it back opaquely; the token branch never reads it.
const TOKEN_SERVICE: &str = "registry-gateway";

#[derive(Deserialize)]
pub struct TokenQuery {
    scope: Option<String>,
}

/// Usage page on `/`, any method tolerated
pub async fn handle_docs() -> impl IntoResponse {
    Html(DOCS)
}

/// Registry API root probe (`/v2/`).
///
/// Forwarded with only the client's Authorization header. An upstream 401
/// is replaced with the gateway's own challenge so the client fetches its
/// token through `/v2/auth`; everything else relays verbatim.
pub async fn handle_v2_probe(
    State(state): State<AppState>,
    Host(host): Host,
    headers: HeaderMap,
) -> Response {
    let Some(target) = state.table.resolve(hostname(&host)) else {
        return route_miss(&state.table);
    };

    let authorization = headers.get(header::AUTHORIZATION);
    match state.upstream.probe_v2(&target.origin, authorization).await {
        Ok(resp) if resp.status() == StatusCode::UNAUTHORIZED => gateway_challenge(&host),
        Ok(resp) => relay_response(resp),
        Err(e) => bad_gateway(e),
    }
}

/// Token endpoint (`/v2/auth`).
///
/// Re-probes the upstream's `/v2/` anonymously to discover its real token
/// service, rewrites the requested scope for the reference registry, then
/// relays the token fetch with the client's credentials.
pub async fn handle_token(
    State(state): State<AppState>,
    Host(host): Host,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(target) = state.table.resolve(hostname(&host)) else {
        return route_miss(&state.table);
    };

    let probe = match state.upstream.probe_v2(&target.origin, None).await {
        Ok(resp) => resp,
        Err(e) => return bad_gateway(e),
    };

    // Upstream doesn't require auth: nothing to relay
    if probe.status() != StatusCode::UNAUTHORIZED {
        return relay_response(probe);
    }

    let challenge_header = probe
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    // Without a challenge the handshake cannot continue; hand back the 401
    let Some(challenge_header) = challenge_header else {
        return relay_response(probe);
    };

    let challenge = match auth::parse_authenticate(&challenge_header) {
        Ok(challenge) => challenge,
        Err(e) => {
            warn!("Upstream {} sent an unusable challenge: {}", target.origin, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let scope = query.scope.map(|scope| {
        if target.is_default_registry {
            auth::rewrite_scope(&scope)
        } else {
            scope
        }
    });

    let authorization = headers.get(header::AUTHORIZATION);
    match state
        .upstream
        .fetch_token(&challenge, scope.as_deref(), authorization)
        .await
    {
        Ok(resp) => relay_response(resp),
        Err(e) => bad_gateway(e),
    }
}

/// Everything else: pass the request through to the resolved upstream,
/// after the legacy unqualified-name redirect for the reference registry.
pub async fn handle_passthrough(
    State(state): State<AppState>,
    Host(host): Host,
    request: Request,
) -> Response {
    let Some(target) = state.table.resolve(hostname(&host)) else {
        return route_miss(&state.table);
    };

    let (parts, body) = request.into_parts();

    if target.is_default_registry {
        if let Some(path) = insert_default_namespace(parts.uri.path()) {
            return legacy_redirect(path, parts.uri.query());
        }
    }

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path());
    let url = format!("{}{}", target.origin, path_and_query);

    debug!("{} {} -> {}", parts.method, parts.uri.path(), url);

    let body = reqwest::Body::wrap_stream(body.into_data_stream());
    match state
        .upstream
        .forward(&url, parts.method, parts.headers, body)
        .await
    {
        Ok(resp) => relay_response(resp),
        Err(e) => bad_gateway(e),
    }
}

/// Hostname part of a Host header value, port stripped
fn hostname(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Legacy two-segment image reference (`/v2/<name>/<kind>/<ref>`, exactly
/// five `/`-separated segments) with the `library` namespace restored.
/// Six-segment paths no longer match, so the redirect cannot loop.
fn insert_default_namespace(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = path.split('/').collect();
    if segments.len() != 5 {
        return None;
    }
    segments.insert(2, "library");
    Some(segments.join("/"))
}

/// 404 listing the whole route table, a discoverability aid for operators
fn route_miss(table: &RouteTable) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "routes": table.routes() }))).into_response()
}

/// Gateway-owned 401 pointing token requests at `/v2/auth` on this host
fn gateway_challenge(host: &str) -> Response {
    let challenge = format!(
        "Bearer realm=\"https://{}/v2/auth\",service=\"{}\"",
        host, TOKEN_SERVICE
    );

    let mut response =
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "UNAUTHORIZED" }))).into_response();
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

/// 301 with a relative Location, so the client keeps its own scheme/host
fn legacy_redirect(path: String, query: Option<&str>) -> Response {
    let location = match query {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };

    let mut response = StatusCode::MOVED_PERMANENTLY.into_response();
    if let Ok(value) = HeaderValue::from_str(&location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// Upstream response relayed as-is: status, headers, streamed body
fn relay_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = upstream.headers().clone();

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn bad_gateway(message: String) -> Response {
    warn!("{}", message);
    (StatusCode::BAD_GATEWAY, message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_strips_port() {
        assert_eq!(hostname("docker.example.com:8050"), "docker.example.com");
        assert_eq!(hostname("docker.example.com"), "docker.example.com");
        assert_eq!(hostname("[::1]:8050"), "[::1]");
    }

    #[test]
    fn test_insert_default_namespace_on_short_reference() {
        assert_eq!(
            insert_default_namespace("/v2/busybox/manifests/latest").as_deref(),
            Some("/v2/library/busybox/manifests/latest")
        );
        assert_eq!(
            insert_default_namespace("/v2/busybox/blobs/sha256%3Aabc").as_deref(),
            Some("/v2/library/busybox/blobs/sha256%3Aabc")
        );
    }

    #[test]
    fn test_insert_default_namespace_is_not_recursive() {
        // The corrected path has six segments and no longer matches
        assert_eq!(
            insert_default_namespace("/v2/library/busybox/manifests/latest"),
            None
        );
    }

    #[test]
    fn test_insert_default_namespace_skips_other_shapes() {
        assert_eq!(insert_default_namespace("/v2/"), None);
        assert_eq!(insert_default_namespace("/v2/_catalog"), None);
        // Trailing slash changes the segment count and must not match
        assert_eq!(insert_default_namespace("/v2/busybox/manifests/latest/"), None);
    }

    #[test]
    fn test_legacy_redirect_preserves_query() {
        let response = legacy_redirect(
            "/v2/library/busybox/manifests/latest".to_string(),
            Some("ns=docker.io"),
        );
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/v2/library/busybox/manifests/latest?ns=docker.io"
        );
    }

    #[test]
    fn test_gateway_challenge_points_at_this_host() {
        let response = gateway_challenge("docker.example.com");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=\"https://docker.example.com/v2/auth\",service=\"registry-gateway\""
        );
    }
}
