//! CLI entry point for the graphbridge tool server.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use graphbridge_core::{JsonObject, Settings};
use graphbridge_graph::{ConnectionManager, GraphConfig, Neo4jConnector};
use graphbridge_mcp::client::DEFAULT_ENDPOINT;
use graphbridge_mcp::{http, Dispatcher, GraphToolClient, GraphToolServer};

#[derive(Parser)]
#[command(name = "graphbridge")]
#[command(about = "MCP tool server exposing a Neo4j graph database")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: graphbridge).
    #[arg(short, long, default_value = "graphbridge", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the tools over streamable HTTP.
    Serve,

    /// Invoke one operation on a running server and print its envelope.
    Call {
        /// Operation name: run_query, create_node, find_nodes, get_database_info.
        operation: String,

        /// Arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,

        /// Server endpoint.
        #[arg(long, env = "GRAPHBRIDGE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
        endpoint: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve => serve(&cli.config).await,
        Command::Call {
            operation,
            args,
            endpoint,
        } => call(&endpoint, &operation, &args).await,
    }
}

async fn serve(config_prefix: &str) -> anyhow::Result<()> {
    let settings = Settings::load(config_prefix)?;
    tracing::info!(
        uri = %settings.neo4j.uri,
        bind = %settings.server.bind_address(),
        statement_timeout_secs = settings.server.statement_timeout_secs,
        "Configuration loaded"
    );

    let connections = Arc::new(ConnectionManager::new(Neo4jConnector::new(
        GraphConfig::from(&settings.neo4j),
    )));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&connections),
        settings.server.statement_timeout(),
    ));
    let server = GraphToolServer::new(dispatcher);

    http::serve(server, &settings.server.bind_address(), shutdown_signal()).await?;

    connections.release().await;
    tracing::info!("Graph tool server stopped");
    Ok(())
}

async fn call(endpoint: &str, operation: &str, args: &str) -> anyhow::Result<()> {
    let arguments: JsonObject = serde_json::from_str(args)
        .map_err(|e| anyhow::anyhow!("--args must be a JSON object: {e}"))?;

    let client = GraphToolClient::new(endpoint);
    let envelope = client.call(operation, arguments).await;
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if envelope["success"] != serde_json::Value::Bool(true) {
        std::process::exit(1);
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
