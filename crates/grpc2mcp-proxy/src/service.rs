//! Implements the generated `ModelContextProtocol` trait by translating
//! each RPC into one (or two, for `initialize`) upstream JSON-RPC calls
//! (spec §4.1, §4.5, §4.7).

use std::pin::Pin;

use futures::Stream;
use grpc2mcp_proto::model_context_protocol_server::ModelContextProtocol;
use grpc2mcp_proto::*;
use prost_types::Struct;
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tonic::{Request, Response, Status, Streaming};

use crate::content::decode_content_blocks;
use crate::headers::project_headers;
use crate::interceptor::SessionContext;
use crate::jsonrpc::{self, JsonRpcOutcome};
use crate::mcpconst;
use crate::pbjson::{json_to_struct, struct_to_json};

pub struct ProxyService {
    client: reqwest::Client,
    upstream_url: String,
}

impl ProxyService {
    pub fn new(upstream_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upstream_url: upstream_url.into(),
        }
    }

    fn extract<T>(request: &Request<T>) -> (SessionContext, std::collections::HashMap<String, String>) {
        let ctx = request
            .extensions()
            .get::<SessionContext>()
            .cloned()
            .unwrap_or_default();
        let headers = project_headers(request.metadata(), &ctx);
        (ctx, headers)
    }

    async fn call_for_result(
        &self,
        method: &str,
        params: Option<&Value>,
        headers: &std::collections::HashMap<String, String>,
    ) -> Result<Value, Status> {
        let (outcome, _session_id) =
            jsonrpc::send(&self.client, &self.upstream_url, method, params, headers)
                .await
                .map_err(crate::error::ProxyError::from)?;

        match outcome {
            JsonRpcOutcome::Result(value) => Ok(value),
            JsonRpcOutcome::Error { code, message, .. } => {
                Err(crate::error::ProxyError::Aborted { code, message }.into())
            }
            JsonRpcOutcome::Empty => Ok(Value::Null),
        }
    }
}

fn optional_struct_to_json(s: &Option<Struct>) -> Value {
    s.as_ref().map(struct_to_json).unwrap_or_else(|| json!({}))
}

#[tonic::async_trait]
impl ModelContextProtocol for ProxyService {
    async fn initialize(
        &self,
        request: Request<InitializeRequest>,
    ) -> Result<Response<InitializeResult>, Status> {
        let (_ctx, headers) = Self::extract(&request);
        let req = request.into_inner();

        let client_info = req.client_info.as_ref().map(|i| {
            json!({"name": i.name, "version": i.version})
        });
        let params = json!({
            "protocolVersion": req.protocol_version,
            "capabilities": optional_struct_to_json(&req.capabilities.and_then(|c| c.extra)),
            "clientInfo": client_info,
        });

        let (outcome, session_id) = jsonrpc::send(
            &self.client,
            &self.upstream_url,
            mcpconst::INITIALIZE,
            Some(&params),
            &headers,
        )
        .await
        .map_err(crate::error::ProxyError::from)?;

        // A 200 OK with an empty body is a legitimate `initialize` reply —
        // the session id lives in the response header, not the body — so
        // only an explicit JSON-RPC error aborts the call here.
        let result = match outcome {
            JsonRpcOutcome::Result(value) => Some(value),
            JsonRpcOutcome::Error { code, message, .. } => {
                return Err(crate::error::ProxyError::Aborted { code, message }.into())
            }
            JsonRpcOutcome::Empty => None,
        };

        let session_id = session_id.ok_or_else(|| {
            Status::from(crate::error::ProxyError::Internal(
                "upstream did not return a session id on initialize".to_string(),
            ))
        })?;

        let mut ack_headers = headers.clone();
        ack_headers.insert(mcpconst::MCP_SESSION_ID_HEADER.to_string(), session_id.clone());
        jsonrpc::send::<Value>(
            &self.client,
            &self.upstream_url,
            mcpconst::NOTIFICATIONS_INITIALIZED,
            None,
            &ack_headers,
        )
        .await
        .map_err(crate::error::ProxyError::from)?;

        let server_info = result.as_ref().and_then(|r| r.get("serverInfo")).map(|v| Implementation {
            name: v.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            version: v.get("version").and_then(Value::as_str).unwrap_or_default().to_string(),
        });

        let mut response = Response::new(InitializeResult {
            protocol_version: result
                .as_ref()
                .and_then(|r| r.get("protocolVersion"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            capabilities: result.as_ref().and_then(|r| r.get("capabilities")).map(json_to_struct),
            server_info,
            instructions: result
                .as_ref()
                .and_then(|r| r.get("instructions"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
        response.metadata_mut().insert(
            "mcp-session-id",
            session_id
                .parse()
                .map_err(|_| Status::internal("session id is not a valid header value"))?,
        );
        Ok(response)
    }

    async fn ping(&self, request: Request<PingRequest>) -> Result<Response<PingResult>, Status> {
        let (_ctx, headers) = Self::extract(&request);
        self.call_for_result(mcpconst::PING, None::<&Value>, &headers)
            .await?;
        Ok(Response::new(PingResult {}))
    }

    async fn list_tools(
        &self,
        request: Request<ListToolsRequest>,
    ) -> Result<Response<ListToolsResult>, Status> {
        let (_ctx, headers) = Self::extract(&request);
        let req = request.into_inner();
        let params = req.cursor.as_ref().map(|c| json!({"cursor": c}));
        let result = self
            .call_for_result(mcpconst::TOOLS_LIST, params.as_ref(), &headers)
            .await?;

        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().map(tool_from_json).collect())
            .unwrap_or_default();

        Ok(Response::new(ListToolsResult {
            tools,
            next_cursor: result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(|s| s.to_string()),
        }))
    }

    async fn call_method(
        &self,
        request: Request<CallToolRequest>,
    ) -> Result<Response<CallToolResult>, Status> {
        let (_ctx, headers) = Self::extract(&request);
        let result = self.do_call_method(request.into_inner(), &headers).await?;
        Ok(Response::new(result))
    }

    type CallMethodStreamStream =
        Pin<Box<dyn Stream<Item = Result<CallToolResult, Status>> + Send + 'static>>;

    async fn call_method_stream(
        &self,
        request: Request<Streaming<CallToolRequest>>,
    ) -> Result<Response<Self::CallMethodStreamStream>, Status> {
        let (_ctx, headers) = Self::extract(&request);
        let mut inbound = request.into_inner();
        let client = self.client.clone();
        let upstream_url = self.upstream_url.clone();

        let outbound = async_stream::try_stream! {
            while let Some(call) = inbound.next().await {
                let call = call?;
                let svc = ProxyService { client: client.clone(), upstream_url: upstream_url.clone() };
                let result = svc.do_call_method(call, &headers).await?;
                yield result;
            }
        };

        Ok(Response::new(Box::pin(outbound)))
    }

    async fn list_prompts(
        &self,
        request: Request<ListPromptsRequest>,
    ) -> Result<Response<ListPromptsResult>, Status> {
        let (_ctx, headers) = Self::extract(&request);
        let req = request.into_inner();
        let params = req.cursor.as_ref().map(|c| json!({"cursor": c}));
        let result = self
            .call_for_result(mcpconst::PROMPTS_LIST, params.as_ref(), &headers)
            .await?;

        let prompts = result
            .get("prompts")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().map(prompt_from_json).collect())
            .unwrap_or_default();

        Ok(Response::new(ListPromptsResult {
            prompts,
            next_cursor: result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(|s| s.to_string()),
        }))
    }

    async fn get_prompt(
        &self,
        request: Request<GetPromptRequest>,
    ) -> Result<Response<GetPromptResult>, Status> {
        let (_ctx, headers) = Self::extract(&request);
        let req = request.into_inner();
        let params = json!({"name": req.name, "arguments": req.arguments});
        let result = self
            .call_for_result(mcpconst::PROMPTS_GET, Some(&params), &headers)
            .await?;

        let messages = result
            .get("messages")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| {
                        let role = m.get("role")?.as_str()?.to_string();
                        let content = m.get("content")?;
                        let blocks = decode_content_blocks(std::slice::from_ref(content));
                        Some(PromptMessage {
                            role,
                            content: blocks.into_iter().next(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Response::new(GetPromptResult {
            description: result
                .get("description")
                .and_then(Value::as_str)
                .map(|s| s.to_string()),
            messages,
        }))
    }

    async fn list_resources(
        &self,
        request: Request<ListResourcesRequest>,
    ) -> Result<Response<ListResourcesResult>, Status> {
        let (_ctx, headers) = Self::extract(&request);
        let req = request.into_inner();
        let params = req.cursor.as_ref().map(|c| json!({"cursor": c}));
        let result = self
            .call_for_result(mcpconst::RESOURCES_LIST, params.as_ref(), &headers)
            .await?;

        let resources = result
            .get("resources")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().map(resource_from_json).collect())
            .unwrap_or_default();

        Ok(Response::new(ListResourcesResult {
            resources,
            next_cursor: result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(|s| s.to_string()),
        }))
    }

    async fn list_resource_templates(
        &self,
        request: Request<ListResourceTemplatesRequest>,
    ) -> Result<Response<ListResourceTemplatesResult>, Status> {
        let (_ctx, headers) = Self::extract(&request);
        let req = request.into_inner();
        let params = req.cursor.as_ref().map(|c| json!({"cursor": c}));
        let result = self
            .call_for_result(mcpconst::RESOURCES_TEMPLATES_LIST, params.as_ref(), &headers)
            .await?;

        let resource_templates = result
            .get("resourceTemplates")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .map(|t| ResourceTemplate {
                        uri_template: t
                            .get("uriTemplate")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        name: t.get("name").and_then(Value::as_str).map(|s| s.to_string()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Response::new(ListResourceTemplatesResult {
            resource_templates,
            next_cursor: result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(|s| s.to_string()),
        }))
    }

    async fn complete(
        &self,
        request: Request<CompleteRequest>,
    ) -> Result<Response<CompleteResult>, Status> {
        let (_ctx, headers) = Self::extract(&request);
        let req = request.into_inner();
        let argument = req.argument.map(|a| json!({"name": a.name, "value": a.value}));
        let params = json!({"argument": argument});
        let result = self
            .call_for_result(mcpconst::COMPLETION_COMPLETE, Some(&params), &headers)
            .await?;

        let completion = result.get("completion").unwrap_or(&result);
        let values = completion
            .get("values")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Response::new(CompleteResult {
            values,
            total: completion.get("total").and_then(Value::as_i64).map(|n| n as i32),
            has_more: completion.get("hasMore").and_then(Value::as_bool),
        }))
    }
}

impl ProxyService {
    async fn do_call_method(
        &self,
        req: CallToolRequest,
        headers: &std::collections::HashMap<String, String>,
    ) -> Result<CallToolResult, Status> {
        let arguments: serde_json::Map<String, Value> = req
            .arguments
            .iter()
            .map(|(k, v)| (k.clone(), crate::pbjson::pb_value_to_json(v)))
            .collect();
        let params = json!({"name": req.name, "arguments": Value::Object(arguments)});

        let result = self
            .call_for_result(mcpconst::TOOLS_CALL, Some(&params), headers)
            .await?;

        let content = result
            .get("content")
            .and_then(Value::as_array)
            .map(|arr| decode_content_blocks(arr))
            .unwrap_or_default();

        Ok(CallToolResult {
            content,
            structured_content: result.get("structuredContent").map(json_to_struct),
            is_error: result.get("isError").and_then(Value::as_bool),
        })
    }
}

fn tool_from_json(v: &Value) -> Tool {
    Tool {
        metadata: Some(BaseMetadata {
            name: v.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            title: v.get("title").and_then(Value::as_str).map(|s| s.to_string()),
        }),
        description: v
            .get("description")
            .and_then(Value::as_str)
            .map(|s| s.to_string()),
        input_schema: v.get("inputSchema").map(json_to_struct),
        output_schema: v.get("outputSchema").map(json_to_struct),
        annotations: v.get("annotations").map(json_to_struct),
        x_meta: v.get("_meta").map(json_to_struct),
    }
}

fn prompt_from_json(v: &Value) -> Prompt {
    Prompt {
        metadata: Some(BaseMetadata {
            name: v.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            title: v.get("title").and_then(Value::as_str).map(|s| s.to_string()),
        }),
        description: v
            .get("description")
            .and_then(Value::as_str)
            .map(|s| s.to_string()),
    }
}

fn resource_from_json(v: &Value) -> Resource {
    Resource {
        uri: v.get("uri").and_then(Value::as_str).unwrap_or_default().to_string(),
        name: v.get("name").and_then(Value::as_str).map(|s| s.to_string()),
        mime_type: v
            .get("mimeType")
            .and_then(Value::as_str)
            .map(|s| s.to_string()),
    }
}
