use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use coralogix_mcp::client::CoralogixClient;
use coralogix_mcp::config::{Config, ConnectionConfig, ServerMode};
use coralogix_mcp::http::{bind_http, serve_http, serve_listener};
use coralogix_mcp::mcp::run_stdio;
use coralogix_mcp::service::LogService;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries JSON-RPC in stdio mode, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => Config::load_from_path(Path::new(path))
            .with_context(|| format!("loading config from {path}"))?,
        None => Config::default(),
    };

    // Missing credentials are reported on the first tool call, not here.
    let connection = match ConnectionConfig::from_env() {
        Ok(c) => {
            info!(domain = %c.domain, "Coralogix connection configured");
            Some(c)
        }
        Err(e) => {
            warn!("{e}");
            None
        }
    };
    let service = Arc::new(LogService::new(CoralogixClient::new(connection)));

    match config.server.mode {
        ServerMode::Stdio => {
            info!("Coralogix MCP server running on stdio");
            run_stdio(service).await?;
        }
        ServerMode::Http => {
            serve_http(service, &config.server).await?;
        }
        ServerMode::Both => {
            // A bind failure aborts startup.
            let listener = bind_http(&config.server).await?;
            let http_service = service.clone();
            let http_task = tokio::spawn(async move {
                if let Err(e) = serve_listener(listener, http_service).await {
                    error!("HTTP server failed: {e}");
                }
            });
            info!("Coralogix MCP server running on stdio");
            run_stdio(service).await?;
            // stdin closed: the host is gone, stop serving HTTP as well.
            http_task.abort();
        }
    }

    Ok(())
}
