use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tdx_projects_agent::registry::environments::EnvironmentRegistry;
use tdx_projects_agent::server;
use tdx_projects_agent::shaping::ResponseShaper;
use tdx_projects_agent::tools::handlers::ToolHandlers;
use tdx_projects_agent::utils::config_loader;
use tdx_projects_agent::utils::logging;
use tdx_projects_agent::utils::logging::LogLevel;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "tdx-projects-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Config and logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config)?;
    logging::run(&service_config, args.log_level.to_owned());

    // -------------------------------
    // 2. Environments and tool handlers
    // -------------------------------

    let registry = Arc::new(EnvironmentRegistry::from_config(&service_config)?);
    let shaper = ResponseShaper::from_config(&service_config.settings.shaping);
    let handlers = ToolHandlers::new(registry, shaper);

    // -------------------------------
    // 3. Optional metrics endpoint
    // -------------------------------

    let settings = service_config.settings.clone();
    let metrics_server = tokio::spawn(async move {
        if let Err(e) = server::server::start(&settings).await {
            error!("metrics server stopped: {:#}", e);
        }
    });

    // -------------------------------
    // 4. Serve tool calls until stdin closes
    // -------------------------------

    info!("Service starting...");
    tokio::select! {
        result = server::stdio::serve_stdio(handlers) => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
    }

    metrics_server.abort();
    Ok(())
}
