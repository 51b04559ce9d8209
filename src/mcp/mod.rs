//! MCP (Model Context Protocol) server for Kubecost
//!
//! Exposes the Kubecost budget and cost APIs as MCP tools over
//! JSON-RPC on stdio.
//!
//! - `protocol`: JSON-RPC and MCP message types
//! - `tools`: tool registry with typed inputs and generated schemas
//! - `dispatch`: tool call to API call, wrapped in a result envelope
//! - `server`: the stdio event loop

pub mod dispatch;
pub mod protocol;
pub mod server;
pub mod tools;

pub use dispatch::Dispatcher;
pub use server::McpServer;
pub use tools::{Tool, ToolCall, ToolError};
