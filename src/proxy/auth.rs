// Bearer-challenge parsing and scope normalization for the registry v2
// token handshake.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

// `name="value"` attribute pairs inside a WWW-Authenticate header
static ATTRIBUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\w+)\s*=\s*"((?:\\.|[^"\\])*)""#).unwrap());

/// Token endpoint advertised by an upstream registry in its 401 challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub realm: String,
    pub service: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid WWW-Authenticate header: {0}")]
    MalformedChallenge(String),
}

/// Extract `realm` and `service` from a `WWW-Authenticate: Bearer ...`
/// header value.
///
/// Attributes are looked up by name; when the upstream omits either name,
/// the first two quoted values are taken positionally (realm then service),
/// which is how every known registry orders them. Fewer than two quoted
/// values is a malformed challenge.
pub fn parse_authenticate(header: &str) -> Result<AuthChallenge, AuthError> {
    let attributes: Vec<(String, String)> = ATTRIBUTE_RE
        .captures_iter(header)
        .map(|caps| (caps[1].to_ascii_lowercase(), caps[2].to_string()))
        .collect();

    if attributes.len() < 2 {
        return Err(AuthError::MalformedChallenge(header.to_string()));
    }

    let named = |name: &str| {
        attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    };

    match (named("realm"), named("service")) {
        (Some(realm), Some(service)) => Ok(AuthChallenge { realm, service }),
        // Non-conforming upstream: fall back to emission order
        _ => Ok(AuthChallenge {
            realm: attributes[0].1.clone(),
            service: attributes[1].1.clone(),
        }),
    }
}

/// Prefix `library/` onto unqualified repository names in a token scope.
///
/// Applies only to the exact `<type>:<name>:<actions>` shape where the name
/// has no namespace; anything else passes through untouched. Callers gate
/// this on the resolved upstream being the reference registry.
pub fn rewrite_scope(scope: &str) -> String {
    let parts: Vec<&str> = scope.split(':').collect();
    if parts.len() == 3 && !parts[1].contains('/') {
        format!("{}:library/{}:{}", parts[0], parts[1], parts[2])
    } else {
        scope.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_realm_and_service() {
        let challenge = parse_authenticate(
            r#"Bearer realm="https://auth.example/token",service="registry.example""#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "https://auth.example/token");
        assert_eq!(challenge.service, "registry.example");
    }

    #[test]
    fn test_parse_ignores_extra_attributes() {
        let challenge = parse_authenticate(
            r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/busybox:pull""#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "https://auth.docker.io/token");
        assert_eq!(challenge.service, "registry.docker.io");
    }

    #[test]
    fn test_parse_is_order_independent_when_named() {
        let challenge = parse_authenticate(
            r#"Bearer service="registry.example",realm="https://auth.example/token""#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "https://auth.example/token");
        assert_eq!(challenge.service, "registry.example");
    }

    #[test]
    fn test_parse_positional_fallback() {
        // Upstream that spells the attributes differently still yields the
        // first two quoted values in emission order
        let challenge =
            parse_authenticate(r#"Bearer auth="https://tokens.example",svc="pull.example""#)
                .unwrap();
        assert_eq!(challenge.realm, "https://tokens.example");
        assert_eq!(challenge.service, "pull.example");
    }

    #[test]
    fn test_parse_rejects_single_attribute() {
        let err = parse_authenticate(r#"Bearer error="invalid_token""#).unwrap_err();
        assert!(matches!(err, AuthError::MalformedChallenge(_)));
    }

    #[test]
    fn test_parse_rejects_unquoted_header() {
        assert!(parse_authenticate("Basic realm=registry").is_err());
    }

    #[test]
    fn test_rewrite_unqualified_name() {
        assert_eq!(
            rewrite_scope("repository:busybox:pull"),
            "repository:library/busybox:pull"
        );
    }

    #[test]
    fn test_rewrite_keeps_qualified_name() {
        assert_eq!(
            rewrite_scope("repository:library/busybox:pull"),
            "repository:library/busybox:pull"
        );
        assert_eq!(
            rewrite_scope("repository:grafana/loki:pull,push"),
            "repository:grafana/loki:pull,push"
        );
    }

    #[test]
    fn test_rewrite_is_structural_not_semantic() {
        // Any three-segment scope with an unqualified middle gets the
        // prefix, whatever the resource type says
        assert_eq!(rewrite_scope("registry:catalog:*"), "registry:library/catalog:*");
    }

    #[test]
    fn test_rewrite_passes_through_malformed_scopes() {
        assert_eq!(rewrite_scope("repository:busybox"), "repository:busybox");
        assert_eq!(rewrite_scope(""), "");
        assert_eq!(
            rewrite_scope("repository:busybox:pull:extra"),
            "repository:busybox:pull:extra"
        );
    }
}
