//! A minimal in-process MCP server used only by the integration tests in
//! this crate: a handful of tools (`add`, `mult`, `lower`), a `greeting`
//! resource, and a `greet` prompt, enough to exercise every RPC the
//! proxy translates.

use std::collections::HashSet;
use std::sync::Mutex;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use grpc2mcp_proxy::closeline::CloseLine;
use serde_json::{json, Value};

#[derive(Default)]
struct DemoState {
    sessions: Mutex<HashSet<String>>,
}

/// Spawns the demo MCP server on an ephemeral port and returns its base
/// URL plus a `CloseLine` that shuts it down when closed.
pub async fn spawn() -> (String, CloseLine) {
    let state = std::sync::Arc::new(DemoState::default());
    let app = Router::new()
        .route("/mcp", post(handle))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    let close = CloseLine::new();
    close.add(move || {
        let _ = tx.send(());
        drop(join);
    });

    (format!("http://{addr}/mcp"), close)
}

async fn handle(
    State(state): State<std::sync::Arc<DemoState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let method = body.get("method").and_then(Value::as_str).unwrap_or("");
    let id = body.get("id").cloned();

    match method {
        "initialize" => {
            // Real MCP servers reply to `initialize` with `200 OK`, an
            // empty body, and the session id in the response header — not
            // a result payload. Mirror that here rather than a full
            // `InitializeResult`, since a demo server that always hands
            // back a body would hide a proxy that wrongly requires one.
            let session_id = format!("demo-session-{}", rand::random::<u32>());
            state.sessions.lock().unwrap().insert(session_id.clone());
            let mut response = StatusCode::OK.into_response();
            response
                .headers_mut()
                .insert("mcp-session-id", session_id.parse().unwrap());
            response
        }
        "notifications/initialized" => StatusCode::ACCEPTED.into_response(),
        "ping" => Json(ok_envelope(id, json!({}))).into_response(),
        "tools/list" => Json(ok_envelope(
            id,
            json!({
                "tools": [
                    {"name": "add", "description": "adds two numbers", "inputSchema": {"type": "object"}},
                    {"name": "mult", "description": "multiplies two numbers", "inputSchema": {"type": "object"}},
                    {"name": "lower", "description": "lowercases a string", "inputSchema": {"type": "object"}},
                    {"name": "greet_resource", "description": "returns a greeting resource link", "inputSchema": {"type": "object"}},
                ],
            }),
        ))
        .into_response(),
        "tools/call" => {
            if !has_session(&headers, &state) {
                return (StatusCode::UNAUTHORIZED, "missing session").into_response();
            }
            match call_tool(id, &body) {
                Ok(envelope) => Json(envelope).into_response(),
                Err(status) => status.into_response(),
            }
        }
        "prompts/list" => Json(ok_envelope(
            id,
            json!({"prompts": [{"name": "greet", "description": "greets someone"}]}),
        ))
        .into_response(),
        "prompts/get" => Json(ok_envelope(
            id,
            json!({
                "description": "a friendly greeting",
                "messages": [
                    {"role": "user", "content": {"type": "text", "text": "say hello"}},
                ],
            }),
        ))
        .into_response(),
        "resources/list" => Json(ok_envelope(
            id,
            json!({"resources": [{"uri": "demo://greeting", "name": "greeting", "mimeType": "text/plain"}]}),
        ))
        .into_response(),
        "resources/templates/list" => Json(ok_envelope(
            id,
            json!({"resourceTemplates": [{"uriTemplate": "demo://{name}", "name": "named"}]}),
        ))
        .into_response(),
        "completion/complete" => Json(ok_envelope(
            id,
            json!({"completion": {"values": ["alice", "alicia"], "total": 2, "hasMore": false}}),
        ))
        .into_response(),
        _ => Json(error_envelope(id, -32601, "method not found")).into_response(),
    }
}

fn has_session(headers: &HeaderMap, state: &DemoState) -> bool {
    headers
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .map(|sid| state.sessions.lock().unwrap().contains(sid))
        .unwrap_or(false)
}

fn call_tool(id: Option<Value>, body: &Value) -> Result<Value, Response> {
    let params = body.get("params").cloned().unwrap_or(json!({}));
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    let result = match name {
        "add" => {
            let a = arguments.get("a").and_then(Value::as_f64);
            let b = arguments.get("b").and_then(Value::as_f64);
            match (a, b) {
                (Some(a), Some(b)) => text_result(format!("{}", a + b)),
                _ => return Ok(error_envelope(id, -32602, "add requires numeric a and b")),
            }
        }
        "mult" => {
            let a = arguments.get("a").and_then(Value::as_f64);
            let b = arguments.get("b").and_then(Value::as_f64);
            match (a, b) {
                (Some(a), Some(b)) => text_result(format!("{}", a * b)),
                _ => return Ok(error_envelope(id, -32602, "mult requires numeric a and b")),
            }
        }
        "lower" => match arguments.get("text").and_then(Value::as_str) {
            Some(text) => text_result(text.to_lowercase()),
            None => return Ok(error_envelope(id, -32602, "lower requires a text argument")),
        },
        "greet_resource" => json!({
            "content": [
                {"type": "resource_link", "uri": "demo://greeting", "name": "greeting", "mimeType": "text/plain"},
            ],
        }),
        _ => return Ok(error_envelope(id, -32602, format!("unknown tool: {name}"))),
    };

    Ok(ok_envelope(id, result))
}

fn text_result(text: String) -> Value {
    json!({"content": [{"type": "text", "text": text}]})
}

fn ok_envelope(id: Option<Value>, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn error_envelope(id: Option<Value>, code: i64, message: impl Into<String>) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message.into()}})
}
