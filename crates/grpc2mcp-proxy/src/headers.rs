//! Projects inbound gRPC metadata onto the outbound HTTP headers sent to
//! the upstream MCP server (spec §4.4).

use std::collections::HashMap;

use tonic::metadata::MetadataMap;

use crate::interceptor::SessionContext;
use crate::mcpconst::{AUTHORIZATION_HEADER, MCP_SESSION_ID_HEADER};

/// gRPC pseudo-headers (`:authority`, `:path`, ...) and `content-type`
/// never make sense on an outbound JSON-RPC POST and are dropped.
fn is_forwardable(name: &str) -> bool {
    !name.starts_with(':') && !name.eq_ignore_ascii_case("content-type")
}

/// Builds the header map to attach to the upstream JSON-RPC request.
///
/// Forwards every inbound metadata entry verbatim except gRPC
/// pseudo-headers and `content-type`. A multi-valued metadata key
/// collapses to its first value — the proxy has no way to forward a
/// repeated header through a single JSON-RPC POST, so this is a known,
/// documented limitation rather than an attempt at perfect fidelity
/// (spec §4.4, Open Question).
///
/// When the inbound call omitted the session-id or authorization header
/// outright (so metadata has nothing to forward), the interceptor-derived
/// `SessionContext` is used as a fallback — this covers `initialize`,
/// where the session id doesn't exist yet on the wire but may already be
/// known from a prior call in the same stream.
pub fn project_headers(metadata: &MetadataMap, ctx: &SessionContext) -> HashMap<String, String> {
    let mut headers = HashMap::new();

    for entry in metadata.iter() {
        let tonic::metadata::KeyAndValueRef::Ascii(key, value) = entry else {
            continue;
        };
        let name = key.as_str();
        if !is_forwardable(name) {
            continue;
        }
        if headers.contains_key(name) {
            continue;
        }
        if let Ok(value) = value.to_str() {
            headers.insert(name.to_string(), value.to_string());
        }
    }

    if !headers.contains_key(&MCP_SESSION_ID_HEADER.to_lowercase()) {
        if let Some(session_id) = &ctx.session_id {
            headers.insert(MCP_SESSION_ID_HEADER.to_string(), session_id.clone());
        }
    }

    if !headers.contains_key(&AUTHORIZATION_HEADER.to_lowercase()) {
        if let Some(authorization) = &ctx.authorization {
            headers.insert(AUTHORIZATION_HEADER.to_string(), authorization.clone());
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata_with(pairs: &[(&str, &str)]) -> MetadataMap {
        let mut map = MetadataMap::new();
        for (k, v) in pairs {
            map.insert(
                tonic::metadata::MetadataKey::from_bytes(k.as_bytes()).unwrap(),
                v.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn strips_pseudo_headers_and_content_type() {
        let md = metadata_with(&[(":authority", "x"), ("content-type", "application/grpc")]);
        let ctx = SessionContext::default();
        let headers = project_headers(&md, &ctx);
        assert!(headers.is_empty());
    }

    #[test]
    fn forwards_arbitrary_metadata() {
        let md = metadata_with(&[("x-trace-id", "abc")]);
        let ctx = SessionContext::default();
        let headers = project_headers(&md, &ctx);
        assert_eq!(headers.get("x-trace-id"), Some(&"abc".to_string()));
    }

    #[test]
    fn falls_back_to_context_session_id_when_metadata_lacks_it() {
        let md = metadata_with(&[]);
        let ctx = SessionContext {
            session_id: Some("S-9".to_string()),
            authorization: None,
        };
        let headers = project_headers(&md, &ctx);
        assert_eq!(headers.get(MCP_SESSION_ID_HEADER), Some(&"S-9".to_string()));
    }

    #[test]
    fn metadata_session_id_wins_over_context_fallback() {
        let md = metadata_with(&[("mcp-session-id", "from-metadata")]);
        let ctx = SessionContext {
            session_id: Some("from-context".to_string()),
            authorization: None,
        };
        let headers = project_headers(&md, &ctx);
        assert_eq!(
            headers.get("mcp-session-id"),
            Some(&"from-metadata".to_string())
        );
    }
}
