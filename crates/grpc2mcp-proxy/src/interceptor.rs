//! Inbound session + authorization enforcement, applied identically to
//! unary and streaming RPCs (spec §4.3).
//!
//! Unlike a per-service `tonic::Interceptor`, this runs as a `tower::Layer`
//! wrapping the whole server at the HTTP level, because only there is the
//! full gRPC method path (`/mcp.ModelContextProtocol/Initialize`) available
//! to decide whether session enforcement applies.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::{HeaderMap, Request, Response};
use tonic::body::BoxBody;
use tonic::Status;
use tower::{Layer, Service};

use crate::error::ProxyError;
use crate::mcpconst::{requires_session_header, AUTHORIZATION_HEADER, MCP_SESSION_ID_HEADER};

/// Session and authorization values the interceptor derived from the
/// inbound call, threaded through `http::Request::extensions()` so both
/// carriers described in spec §9 ("Session propagation") are available to
/// handlers: the (already-normalized) headers, and this context value.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub session_id: Option<String>,
    pub authorization: Option<String>,
}

/// Normalizes authorization (first-value-wins) and, for methods that
/// require it, validates presence of a session id. Returns the derived
/// `SessionContext` or an `unauthenticated` error (spec §4.3 steps 2-3).
///
/// `http::HeaderMap` is case-insensitive by construction, so the Go
/// source's "try canonical case, then lower-case" fallback (spec §4.3 step
/// 3) has no counterpart here — a single lookup already matches either
/// casing.
pub fn derive_session_context(
    full_method: &str,
    headers: &HeaderMap,
) -> Result<SessionContext, ProxyError> {
    let authorization = headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if !requires_session_header(full_method) {
        return Ok(SessionContext {
            session_id: None,
            authorization,
        });
    }

    let session_id = headers
        .get(MCP_SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match session_id {
        Some(session_id) if !session_id.is_empty() => Ok(SessionContext {
            session_id: Some(session_id),
            authorization,
        }),
        _ => Err(ProxyError::Unauthenticated(format!(
            "missing header: {MCP_SESSION_ID_HEADER}"
        ))),
    }
}

#[derive(Clone, Default)]
pub struct SessionLayer;

impl<S> Layer<S> for SessionLayer {
    type Service = SessionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware { inner }
    }
}

#[derive(Clone)]
pub struct SessionMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<BoxBody>> for SessionMiddleware<S>
where
    S: Service<Request<BoxBody>, Response = Response<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    type Response = Response<BoxBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<BoxBody>) -> Self::Future {
        let full_method = req.uri().path().to_string();

        match derive_session_context(&full_method, req.headers()) {
            Ok(ctx) => {
                if let Some(session_id) = ctx.session_id.clone() {
                    req.headers_mut().insert(
                        MCP_SESSION_ID_HEADER,
                        http::HeaderValue::from_str(&session_id)
                            .unwrap_or_else(|_| http::HeaderValue::from_static("")),
                    );
                }
                req.extensions_mut().insert(ctx);

                let mut inner = self.inner.clone();
                Box::pin(async move { inner.call(req).await })
            }
            Err(err) => {
                let status: Status = err.into();
                Box::pin(async move { Ok(status.into_http()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    #[test]
    fn initialize_skips_session_enforcement() {
        let h = headers(&[]);
        let ctx =
            derive_session_context("/mcp.ModelContextProtocol/Initialize", &h).unwrap();
        assert!(ctx.session_id.is_none());
    }

    #[test]
    fn reflection_skips_session_enforcement() {
        let h = headers(&[]);
        let ctx = derive_session_context(
            "/grpc.reflection.v1.ServerReflection/ServerReflectionInfo",
            &h,
        )
        .unwrap();
        assert!(ctx.session_id.is_none());
    }

    #[test]
    fn ping_without_session_id_is_unauthenticated() {
        let h = headers(&[]);
        let result = derive_session_context("/mcp.ModelContextProtocol/Ping", &h);
        assert!(matches!(result, Err(ProxyError::Unauthenticated(_))));
    }

    #[test]
    fn ping_with_session_id_succeeds() {
        let h = headers(&[("mcp-session-id", "S-123")]);
        let ctx = derive_session_context("/mcp.ModelContextProtocol/Ping", &h).unwrap();
        assert_eq!(ctx.session_id.as_deref(), Some("S-123"));
    }

    #[test]
    fn authorization_is_carried_through_regardless_of_method() {
        let h = headers(&[("authorization", "Bearer abc"), ("mcp-session-id", "S-1")]);
        let ctx = derive_session_context("/mcp.ModelContextProtocol/Ping", &h).unwrap();
        assert_eq!(ctx.authorization.as_deref(), Some("Bearer abc"));
    }
}
