//! MCP (Model Context Protocol) stdio server.
//!
//! Speaks JSON-RPC 2.0 on stdin/stdout. Input may be header framed
//! (`Content-Length`) or newline delimited, decided per message; output is
//! always one JSON object per line.
//!
//! ## Architecture
//!
//! ```text
//! stdin ──► MessageFramer ──► decode ──► Dispatcher ──► ResponseWriter ──► stdout
//!           (ByteAccumulator)               │
//!                                           ├── ToolRegistry   (tools/list)
//!                                           └── ToolExecutor   (tools/call)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use calendar_mcp::mcp::{Dispatcher, Server, ServerInfo};
//!
//! let dispatcher = Dispatcher::new(registry, executor, ServerInfo { name, version });
//! let mut server = Server::new(tokio::io::stdin(), tokio::io::stdout(), dispatcher);
//! let stats = server.run().await?;
//! ```

mod decoder;
mod dispatcher;
mod framing;
mod protocol;
mod server;
mod tools;
mod writer;

pub use decoder::{decode, DecodeError, Decoded};
pub use dispatcher::{Dispatcher, DEFAULT_PROTOCOL_VERSION};
pub use framing::{ByteAccumulator, Frame, Framing, MessageFramer};
pub use protocol::{
    error_codes, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, RequestId, ServerCapabilities, ServerInfo, ToolCapabilities, ToolContent,
    ToolDescriptor, ToolInputSchema, JSONRPC_VERSION,
};
pub use server::{run_stdio, Server, ServerError, SessionStats, DEFAULT_READ_CHUNK_SIZE};
pub use tools::{format_tool, RegistryError, SchemaBuilder, ToolExecutor, ToolRegistry};
pub use writer::{ResponseWriter, WriteError};
