//! Translation layer between a typed `ModelContextProtocol` gRPC surface
//! and an upstream Model Context Protocol (JSON-RPC 2.0 over HTTP/SSE)
//! server.
//!
//! This crate never installs a global `tracing` subscriber — that's the
//! binary's job (`grpc2mcp-cli`).

pub mod closeline;
pub mod content;
pub mod error;
pub mod headers;
pub mod interceptor;
pub mod jsonrpc;
pub mod mcpconst;
pub mod pbjson;
pub mod server;
pub mod service;

pub use error::ProxyError;
pub use server::{start_async, start_on_listener, ShutdownHandle};
pub use service::ProxyService;
