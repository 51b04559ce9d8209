use anyhow::Result;
use clap::Parser;

use kubecost_mcp::cli::{self, Commands};
use kubecost_mcp::config::{ConfigArgs, KubecostConfig};
use kubecost_mcp::kubecost::KubecostClient;
use kubecost_mcp::logging::init_tracing;
use kubecost_mcp::mcp::{Dispatcher, McpServer};

#[derive(Parser)]
#[command(name = "kubecost-mcp")]
#[command(version)]
#[command(about = "MCP server exposing Kubecost budgets and cost reports")]
#[command(long_about = "\
MCP server exposing Kubecost budgets and cost reports

kubecost-mcp speaks the Model Context Protocol over stdio and forwards tool
calls to the Kubecost REST API. Configure it with flags or environment
variables:

  KUBECOST_BASE_URL     Kubecost API base URL (default http://localhost:9090)
  KUBECOST_API_TOKEN    Bearer token (takes precedence)
  KUBECOST_USERNAME     Basic auth user
  KUBECOST_PASSWORD     Basic auth password

TYPICAL USAGE:

  kubecost-mcp                                   # serve on stdio
  kubecost-mcp tools                             # list tools
  kubecost-mcp call get_cost_allocation -a window=7d
")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.config.tracing_config());

    let config = KubecostConfig::from_args(&cli.config).inspect_err(|e| {
        tracing::error!(error = %e, "Failed to start Kubecost MCP server");
    })?;

    tracing::debug!(base_url = %config.base_url, "kubecost-mcp starting");

    let client = KubecostClient::new(&config).inspect_err(|e| {
        tracing::error!(error = %e, "Failed to start Kubecost MCP server");
    })?;
    let dispatcher = Dispatcher::new(client);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => McpServer::new(dispatcher).run().await?,
        Commands::Call(args) => {
            if cli::call::run_call(args, &dispatcher).await? {
                std::process::exit(1);
            }
        }
        Commands::Tools(args) => cli::call::run_tools(args)?,
    }

    tracing::debug!("kubecost-mcp shutting down");

    Ok(())
}
