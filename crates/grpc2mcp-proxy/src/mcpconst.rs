//! JSON-RPC method names and the two HTTP headers the proxy cares about.

/// A JSON-RPC method name used against the upstream MCP server.
pub type JsonRpcMethod = &'static str;

pub const INITIALIZE: JsonRpcMethod = "initialize";
pub const NOTIFICATIONS_INITIALIZED: JsonRpcMethod = "notifications/initialized";
pub const PING: JsonRpcMethod = "ping";
pub const TOOLS_LIST: JsonRpcMethod = "tools/list";
pub const TOOLS_CALL: JsonRpcMethod = "tools/call";
pub const PROMPTS_LIST: JsonRpcMethod = "prompts/list";
pub const PROMPTS_GET: JsonRpcMethod = "prompts/get";
pub const RESOURCES_LIST: JsonRpcMethod = "resources/list";
pub const RESOURCES_TEMPLATES_LIST: JsonRpcMethod = "resources/templates/list";
pub const COMPLETION_COMPLETE: JsonRpcMethod = "completion/complete";

/// Canonical form of the session header MCP servers expect.
pub const MCP_SESSION_ID_HEADER: &str = "Mcp-Session-Id";
/// Canonical form of the authorization header.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// The gRPC server-reflection method, exempted from session enforcement
/// alongside `Initialize` (spec §4.3 step 3).
pub const REFLECTION_METHOD: &str = "/grpc.reflection.v1.ServerReflection/ServerReflectionInfo";

/// JSON-RPC notifications carry no `id` and expect no result body.
pub fn is_notification(method: &str) -> bool {
    method.starts_with("notifications/")
}

/// The unqualified suffix of a gRPC full method name, e.g.
/// `/mcp.ModelContextProtocol/Initialize` -> `Initialize`.
pub fn method_suffix(full_method: &str) -> &str {
    full_method.rsplit('/').next().unwrap_or(full_method)
}

/// Whether a gRPC method requires a session id on the inbound call
/// (spec §4.3 step 3 / §4.5.1).
pub fn requires_session_header(full_method: &str) -> bool {
    method_suffix(full_method) != "Initialize" && full_method != REFLECTION_METHOD
}
