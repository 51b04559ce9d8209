//! Command line subcommands
//!
//! - `serve`: run the MCP server over stdio (default)
//! - `call`: invoke one tool directly and print its envelope
//! - `tools`: print the tool registry

pub mod call;

use clap::Subcommand;

pub use call::{CallArgs, OutputFormat, ToolsArgs};

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Run the MCP server over stdio (for Claude, Cursor, etc.)
    ///
    /// Example:
    ///
    ///  $ KUBECOST_API_TOKEN=... kubecost-mcp serve
    ///
    Serve,

    /// Call a tool directly from the command line
    ///
    /// Example:
    ///
    ///  $ kubecost-mcp call get_cost_allocation -a window=7d
    ///
    ///  $ kubecost-mcp call delete_budget -a budgetId=b-42 -o json
    ///
    Call(CallArgs),

    /// List available tools with their input schemas
    Tools(ToolsArgs),
}
