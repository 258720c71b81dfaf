//! Streamable HTTP transport.
//!
//! The MCP service is mounted at `/mcp` in stateless mode, so every POST is a
//! self-contained request and no session state outlives it. `/health` answers
//! without touching the store.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::routing::get;
use axum::Router;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::ServerError;
use crate::server::GraphToolServer;

/// Stateless transport settings; keep-alive stays at the library default.
fn transport_config() -> StreamableHttpServerConfig {
    StreamableHttpServerConfig {
        stateful_mode: false,
        ..Default::default()
    }
}

/// Build the router serving the tool surface.
pub fn build_http_app(server: GraphToolServer) -> Router {
    let http_service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        transport_config(),
    );

    Router::new()
        .nest_service("/mcp", http_service)
        .route("/health", get(health_check))
}

/// Bind `address` and serve until `shutdown` resolves.
pub async fn serve(
    server: GraphToolServer,
    address: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let addr: SocketAddr = address.parse().map_err(|e: std::net::AddrParseError| {
        ServerError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        }
    })?;
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, server, shutdown).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    server: GraphToolServer,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let app = build_http_app(server);

    let addr = listener.local_addr()?;
    info!(%addr, "Graph tool server listening");
    info!("  POST http://{addr}/mcp - MCP requests");
    info!("  GET  http://{addr}/health - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Graph tool server shutting down");
        })
        .await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::dispatcher::Dispatcher;
    use graphbridge_graph::testing::ScriptedConnector;
    use graphbridge_graph::ConnectionManager;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(connector: &ScriptedConnector) -> Router {
        let manager = Arc::new(ConnectionManager::new(connector.clone()));
        let dispatcher = Arc::new(Dispatcher::new(manager, Duration::from_secs(5)));
        build_http_app(GraphToolServer::new(dispatcher))
    }

    #[tokio::test]
    async fn health_check_does_not_touch_store() {
        let connector = ScriptedConnector::empty();
        let response = app(&connector)
            .oneshot(
                axum::http::Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
        assert_eq!(connector.connect_count(), 0);
    }

    #[test]
    fn transport_runs_stateless_with_keep_alive() {
        let config = transport_config();
        assert!(!config.stateful_mode);
        assert_eq!(config.sse_keep_alive, Some(Duration::from_secs(15)));
    }

    #[tokio::test]
    async fn invalid_bind_address_is_rejected() {
        let server = GraphToolServer::new(Arc::new(Dispatcher::new(
            Arc::new(ConnectionManager::new(ScriptedConnector::empty())),
            Duration::from_secs(5),
        )));
        let err = serve(server, "not-an-address", async {}).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress { .. }));
    }
}
