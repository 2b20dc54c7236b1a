//! Generated message types and the `ModelContextProtocol` service trait.
//!
//! This crate is pure codegen output plus a `tonic_reflection` file
//! descriptor set; the wire schema itself is treated as given (see
//! SPEC_FULL.md §3.5). Nothing here should contain hand-written logic.

tonic::include_proto!("mcp");

/// Encoded `FileDescriptorSet` for gRPC server reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("mcp_descriptor");
