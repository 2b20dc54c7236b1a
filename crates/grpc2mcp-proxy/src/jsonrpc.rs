//! JSON-RPC 2.0 envelope construction and dual-encoding (JSON / SSE)
//! response decoding (spec §4.2).

use std::collections::HashMap;

use rand::Rng;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::ProxyError;
use crate::mcpconst::is_notification;

/// The outcome of decoding an upstream JSON-RPC reply, per spec §4.2.3.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcOutcome {
    /// No envelope was present at all — legal for notification acks.
    Empty,
    /// The envelope carried a populated `error` object.
    Error {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    /// The envelope carried a `result` value.
    Result(Value),
}

/// Builds the JSON-RPC request body. `params` is omitted when `None`; `id`
/// is present (a random non-zero integer) iff `method` is not a
/// notification (spec §4.2.1).
pub fn build_body<P: Serialize>(method: &str, params: Option<&P>) -> Value {
    let mut body = serde_json::Map::new();
    body.insert("jsonrpc".to_string(), Value::String("2.0".to_string()));
    body.insert("method".to_string(), Value::String(method.to_string()));

    if let Some(params) = params {
        body.insert(
            "params".to_string(),
            serde_json::to_value(params).unwrap_or(Value::Null),
        );
    }

    if !is_notification(method) {
        let id: u32 = rand::thread_rng().gen_range(1..=u32::MAX);
        body.insert("id".to_string(), Value::Number(id.into()));
    }

    Value::Object(body)
}

/// Sends a JSON-RPC request to `url` and classifies the reply.
///
/// `additional_headers` are applied after the two fixed headers
/// (`Content-Type`, `Accept`), so a caller-supplied value for either wins
/// (spec §4.2.1 "last writer wins").
///
/// Returns the decoded outcome alongside the upstream's `Mcp-Session-Id`
/// response header, if any — `initialize` is the only caller that needs
/// it, since that's the one call where the session doesn't exist until
/// the upstream mints it (spec §4.1).
pub async fn send<P: Serialize>(
    client: &Client,
    url: &str,
    method: &str,
    params: Option<&P>,
    additional_headers: &HashMap<String, String>,
) -> Result<(JsonRpcOutcome, Option<String>), ProxyError> {
    let body = build_body(method, params);

    let mut builder = client
        .post(url)
        .header("Content-Type", "application/json")
        .header("Accept", "application/json, text/event-stream");

    for (name, value) in additional_headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let response = builder
        .json(&body)
        .send()
        .await
        .map_err(|e| ProxyError::Unavailable {
            status: 0,
            body: format!("failed to reach upstream: {e}"),
        })?;

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let session_id = response
        .headers()
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let text = response.text().await.map_err(|e| ProxyError::Internal(
        format!("failed to read upstream response body: {e}"),
    ))?;

    if !status.is_success() {
        return Err(ProxyError::Unavailable {
            status: status.as_u16(),
            body: text,
        });
    }

    if text.trim().is_empty() {
        return Ok((JsonRpcOutcome::Empty, session_id));
    }

    let envelope_text = if content_type.contains("text/event-stream") {
        match last_sse_data_line(&text) {
            Some(payload) => payload,
            None => return Ok((JsonRpcOutcome::Empty, session_id)),
        }
    } else {
        text
    };

    decode_envelope(&envelope_text).map(|outcome| (outcome, session_id))
}

/// Scans an SSE body line-by-line and returns the payload of the final
/// `data: ` line, if any (spec §4.2.2, P4).
fn last_sse_data_line(body: &str) -> Option<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        .last()
        .map(|payload| payload.trim().to_string())
}

fn decode_envelope(text: &str) -> Result<JsonRpcOutcome, ProxyError> {
    let envelope: Value = serde_json::from_str(text)
        .map_err(|e| ProxyError::Internal(format!("malformed json-rpc envelope: {e}")))?;

    let error = envelope.get("error").filter(|v| !v.is_null());
    let result = envelope.get("result").filter(|v| !v.is_null());

    match (error, result) {
        (Some(error), _) => {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let data = error.get("data").cloned();
            Ok(JsonRpcOutcome::Error { code, message, data })
        }
        (None, Some(result)) => Ok(JsonRpcOutcome::Result(result.clone())),
        (None, None) => Err(ProxyError::Internal(
            "mcp server returned a nil result".to_string(),
        )),
    }
}
