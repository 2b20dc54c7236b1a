//! The proxy's single error type, mapped to `tonic::Status` at the
//! service boundary (spec §6.3, §7).

use tonic::Status;

#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    /// Upstream unreachable, connection failure, or non-2xx status.
    #[error("upstream unavailable: status {status}: {body}")]
    Unavailable { status: u16, body: String },

    /// Malformed body, missing session-id header on Initialize, or any
    /// other internal/decode failure. The upstream body is never embedded
    /// here verbatim beyond what's already in `message` — callers log the
    /// raw body themselves before constructing this variant if useful.
    #[error("internal error: {0}")]
    Internal(String),

    /// The upstream JSON-RPC envelope carried an `error` object.
    #[error("upstream returned an error (code {code}): {message}")]
    Aborted { code: i64, message: String },

    /// Missing or unparseable session-id / authorization on a protected
    /// method.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Missing metadata container on the inbound call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<ProxyError> for Status {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Unavailable { status, body } => {
                Status::unavailable(format!("mcp server returned status {status}: {body}"))
            }
            ProxyError::Internal(msg) => Status::internal(msg),
            ProxyError::Aborted { code, message } => {
                Status::aborted(format!("mcp server returned an error (code {code}): {message}"))
            }
            ProxyError::Unauthenticated(msg) => Status::unauthenticated(msg),
            ProxyError::InvalidArgument(msg) => Status::invalid_argument(msg),
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Unavailable {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            body: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Internal(format!("json decode failure: {err}"))
    }
}
