use clap::Parser;
use miette::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kobo_mcp::config::{self, KoboConfig};
use kobo_mcp::KoboMcpServer;

#[derive(Parser, Debug)]
#[clap(version, about)]
/// MCP server for managing KoboToolbox surveys
struct Args {
    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries the MCP protocol; all diagnostics go to stderr
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    config::load_dotenv();
    let config = KoboConfig::from_env();
    config.validate()?;
    info!(server = %config.server, "Configuration loaded");

    let server = KoboMcpServer::new(&config)?;
    server.run_stdio().await
}
