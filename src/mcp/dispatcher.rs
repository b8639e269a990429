//! JSON-RPC request dispatch.
//!
//! One request in, zero or one response out. Requests are handled strictly
//! one at a time; a `tools/call` holds the dispatcher until its executor
//! future resolves.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::decoder::{decode, Decoded};
use super::protocol::{
    error_codes, CallToolResult, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, RequestId, ServerCapabilities, ServerInfo,
};
use super::tools::{ToolExecutor, ToolRegistry};

/// MCP protocol revision reported by `initialize` unless configured otherwise.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// Methods the dispatcher knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method<'a> {
    Initialize,
    Initialized,
    ListTools,
    CallTool,
    Unknown(&'a str),
}

impl<'a> Method<'a> {
    fn parse(method: &'a str) -> Self {
        match method {
            "initialize" => Method::Initialize,
            "notifications/initialized" => Method::Initialized,
            "tools/list" => Method::ListTools,
            "tools/call" => Method::CallTool,
            other => Method::Unknown(other),
        }
    }
}

/// Routes decoded requests to their handlers.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    executor: Arc<dyn ToolExecutor>,
    server_info: ServerInfo,
    protocol_version: String,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.registry.len())
            .field("server_info", &self.server_info)
            .field("protocol_version", &self.protocol_version)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher over a tool catalogue and the executor behind it.
    pub fn new(
        registry: Arc<ToolRegistry>,
        executor: Arc<dyn ToolExecutor>,
        server_info: ServerInfo,
    ) -> Self {
        Self {
            registry,
            executor,
            server_info,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
        }
    }

    /// Override the protocol version reported by `initialize`.
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// The tool catalogue.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Decode one frame payload and dispatch it.
    pub async fn handle_frame(&self, payload: &[u8]) -> Option<JsonRpcResponse> {
        match decode(payload) {
            Decoded::Request(request) => self.dispatch(request).await,
            Decoded::Ignored => None,
            Decoded::Malformed(e) => {
                warn!(error = %e, "failed to decode message");
                Some(JsonRpcResponse::error(RequestId::Null, error_codes::PARSE_ERROR, "Parse error"))
            }
        }
    }

    /// Dispatch a decoded request.
    ///
    /// Returns `None` when no response is due: `notifications/initialized`,
    /// and any other method sent without an id.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let JsonRpcRequest { method, id, params } = request;
        debug!(%method, id = ?id, "dispatching");

        match Method::parse(&method) {
            Method::Initialized => {
                info!("Client initialized");
                None
            }
            Method::Unknown(name) => {
                let Some(id) = id else {
                    debug!(method = name, "ignoring notification");
                    return None;
                };
                debug!(method = name, "method not found");
                Some(JsonRpcResponse::error(id, error_codes::METHOD_NOT_FOUND, "Method not found"))
            }
            kind @ (Method::Initialize | Method::ListTools | Method::CallTool) => {
                let Some(id) = id else {
                    warn!(%method, "request sent without an id");
                    return Some(JsonRpcResponse::error(
                        RequestId::Null,
                        error_codes::INVALID_REQUEST,
                        format!("Invalid Request: {method} requires id"),
                    ));
                };
                let response = match kind {
                    Method::Initialize => self.initialize(id),
                    Method::ListTools => self.list_tools(id),
                    _ => self.call_tool(id, &params).await,
                };
                Some(response)
            }
        }
    }

    fn initialize(&self, id: RequestId) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: self.protocol_version.clone(),
            capabilities: ServerCapabilities::tools(),
            server_info: self.server_info.clone(),
        };
        respond(id, &result)
    }

    fn list_tools(&self, id: RequestId) -> JsonRpcResponse {
        respond(id, &ListToolsResult { tools: self.registry.descriptors() })
    }

    async fn call_tool(&self, id: RequestId, params: &Map<String, Value>) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Invalid params");
        };
        let empty = Map::new();
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(args)) => args,
            Some(_) => {
                return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Invalid params");
            }
        };

        if !self.registry.contains(name) {
            debug!(tool = name, "tool not found");
            return JsonRpcResponse::error(id, error_codes::METHOD_NOT_FOUND, "Tool not found");
        }

        debug!(tool = name, "invoking tool");
        let text = self.executor.invoke(name, arguments).await;
        respond(id, &CallToolResult::text(text))
    }
}

/// Serialize a result payload into a success response.
fn respond<T: Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            warn!(error = %e, "failed to serialize result");
            JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, "Internal error")
        }
    }
}
