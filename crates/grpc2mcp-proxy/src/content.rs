//! Decodes the polymorphic `content` array of a `tools/call` result into
//! typed `ContentBlock`s (spec §4.6).
//!
//! MCP content blocks are tagged by a `type` string but the tag set is
//! open-ended (servers may emit `image`, `audio`, or future types this
//! proxy doesn't understand yet). A naive tagged-enum deserialize would
//! fail the whole array on the first unrecognized block, so each element
//! is decoded independently: peek `type`, dispatch on it, and skip
//! (with a warning) anything this proxy doesn't model.

use grpc2mcp_proto::{content_block::ContentType, ContentBlock, Resource, ResourceLink, TextContent};
use serde::Deserialize;
use serde_json::Value;

use crate::pbjson::json_to_struct;

#[derive(Deserialize)]
struct TypeProbe {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct RawText {
    text: String,
    #[serde(default)]
    annotations: Value,
}

#[derive(Deserialize)]
struct RawResourceLink {
    uri: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "mimeType", default)]
    mime_type: Option<String>,
}

/// Decodes each element of an upstream `content` array, dropping any
/// block whose `type` this proxy doesn't recognize instead of failing
/// the whole call.
pub fn decode_content_blocks(raw: &[Value]) -> Vec<ContentBlock> {
    raw.iter().filter_map(decode_one).collect()
}

fn decode_one(raw: &Value) -> Option<ContentBlock> {
    let probe: TypeProbe = serde_json::from_value(raw.clone()).ok()?;

    match probe.kind.as_str() {
        "text" => {
            let parsed: RawText = serde_json::from_value(raw.clone()).ok()?;
            Some(ContentBlock {
                content_type: Some(ContentType::Text(TextContent {
                    text: parsed.text,
                    annotations: Some(json_to_struct(&parsed.annotations)),
                })),
            })
        }
        "resource_link" => {
            let parsed: RawResourceLink = serde_json::from_value(raw.clone()).ok()?;
            Some(ContentBlock {
                content_type: Some(ContentType::ResourceLink(ResourceLink {
                    r#type: "resource_link".to_string(),
                    resource: Some(Resource {
                        uri: parsed.uri,
                        name: parsed.name,
                        mime_type: parsed.mime_type,
                    }),
                })),
            })
        }
        other => {
            tracing::warn!(content_type = other, "skipping unrecognized content block");
            None
        }
    }
}
