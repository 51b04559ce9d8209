// Library interface for kubecost-mcp
// The binary imports its modules from here

pub mod cli;
pub mod config;
pub mod kubecost;
pub mod logging;
pub mod mcp;

#[cfg(test)]
mod test_support;
