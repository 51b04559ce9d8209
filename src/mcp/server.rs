//! MCP server - stdio event loop and request routing
//!
//! Reads one JSON-RPC message per line, routes it, and writes one response
//! line per request. Notifications get no response. The loop ends on EOF.
//! Only protocol messages go to the output stream; logs go to stderr.

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::dispatch::Dispatcher;
use super::protocol::*;
use super::tools::Tool;

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "kubecost-mcp";

/// Kubecost MCP server
pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Serve over the process stdin/stdout
    pub async fn run(&self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.run_with(reader, writer).await
    }

    /// Serve over any line-oriented reader and writer
    pub async fn run_with<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        tracing::info!(tools = Tool::ALL.len(), "Kubecost MCP server running on stdio");

        loop {
            line.clear();

            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                tracing::debug!("EOF received, shutting down");
                break;
            }

            let line_trimmed = line.trim();
            if line_trimmed.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(line_trimmed) {
                Ok(req) => req,
                Err(e) => {
                    tracing::debug!(error = %e, "Unparseable message");
                    write_response(&mut writer, &JsonRpcResponse::parse_error(&e.to_string())).await?;
                    continue;
                }
            };

            tracing::debug!(method = %request.method, id = ?request.id, "<-");

            if request.is_notification() {
                self.handle_notification(&request);
                continue;
            }

            let response = self.handle_request(request).await;

            if let Some(ref error) = response.error {
                tracing::debug!(%error, "-> error");
            } else {
                tracing::debug!("-> ok");
            }

            write_response(&mut writer, &response).await?;
        }

        Ok(())
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => tracing::debug!("Client initialized"),
            "notifications/cancelled" => tracing::debug!("Request cancelled"),
            method => tracing::debug!(%method, "Ignoring notification"),
        }
    }

    async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let id = req.id.clone();

        let result = if req.jsonrpc != "2.0" {
            Err(JsonRpcError::invalid_request(format!(
                "Unsupported jsonrpc version: {}",
                req.jsonrpc
            )))
        } else {
            match req.method.as_str() {
                "initialize" => self.handle_initialize(),
                "tools/list" => self.handle_tools_list(),
                "tools/call" => self.handle_tools_call(req.params).await,
                "ping" => Ok(json!({})),
                method => Err(JsonRpcError::method_not_found(method)),
            }
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::error(id, error),
        }
    }

    fn handle_initialize(&self) -> Result<Value, JsonRpcError> {
        to_value(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        })
    }

    fn handle_tools_list(&self) -> Result<Value, JsonRpcError> {
        to_value(ToolsListResult {
            tools: Tool::ALL.iter().map(|tool| tool.info()).collect(),
        })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: ToolCallParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing params"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
            })?;

        let result = self.dispatcher.call(&params.name, params.arguments).await?;
        to_value(result)
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(e.to_string()))
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &JsonRpcResponse) -> Result<()> {
    let output = serde_json::to_string(response)?;
    writer.write_all(output.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
