//! Client shim for calling the tool server over streamable HTTP.
//!
//! Each call opens a fresh MCP session, invokes one tool, and closes the
//! session. Transport failures are folded into `{"success": false, "error"}`
//! so callers only ever deal with envelopes.

use rmcp::model::CallToolRequestParam;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use serde_json::{json, Value};

use graphbridge_core::{JsonObject, PropertyMap};

use crate::error::ClientError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8051/mcp";

#[derive(Debug, Clone)]
pub struct GraphToolClient {
    endpoint: String,
}

impl Default for GraphToolClient {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl GraphToolClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Invoke `operation`, returning its envelope or a transport failure
    /// envelope.
    pub async fn call(&self, operation: &str, arguments: JsonObject) -> Value {
        match self.try_call(operation, arguments).await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, operation, error = %e, "Remote call failed");
                json!({"success": false, "error": e.to_string()})
            }
        }
    }

    /// Invoke `operation` and parse the envelope from the first text content.
    pub async fn try_call(&self, operation: &str, arguments: JsonObject) -> Result<Value, ClientError> {
        let transport = StreamableHttpClientTransport::from_uri(self.endpoint.clone());
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let result = service
            .call_tool(CallToolRequestParam {
                name: operation.to_string().into(),
                arguments: Some(arguments),
            })
            .await;

        if let Err(e) = service.cancel().await {
            tracing::debug!(error = %e, "Session close failed");
        }

        let result = result.map_err(|e| ClientError::Protocol(e.to_string()))?;
        let text = result
            .content
            .iter()
            .find_map(|c| c.as_text().map(|t| t.text.clone()))
            .ok_or_else(|| ClientError::InvalidResponse("no text content in tool result".into()))?;

        serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    pub async fn run_query(&self, query: &str, parameters: Option<JsonObject>) -> Value {
        let mut args = JsonObject::new();
        args.insert("query".into(), Value::String(query.to_string()));
        if let Some(parameters) = parameters {
            args.insert("parameters".into(), Value::Object(parameters));
        }
        self.call("run_query", args).await
    }

    pub async fn create_node(&self, label: &str, properties: PropertyMap) -> Value {
        let mut args = JsonObject::new();
        args.insert("label".into(), Value::String(label.to_string()));
        args.insert("properties".into(), Value::Object(properties));
        self.call("create_node", args).await
    }

    pub async fn find_nodes(
        &self,
        label: Option<&str>,
        properties: Option<PropertyMap>,
        limit: u32,
    ) -> Value {
        let mut args = JsonObject::new();
        if let Some(label) = label {
            args.insert("label".into(), Value::String(label.to_string()));
        }
        if let Some(properties) = properties {
            args.insert("properties".into(), Value::Object(properties));
        }
        args.insert("limit".into(), Value::from(limit));
        self.call("find_nodes", args).await
    }

    pub async fn get_database_info(&self) -> Value {
        self.call("get_database_info", JsonObject::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_endpoint_yields_failure_envelope() {
        // Port 9 (discard) is not expected to speak HTTP.
        let client = GraphToolClient::new("http://127.0.0.1:9/mcp");
        let envelope = client.get_database_info().await;
        assert_eq!(envelope["success"], json!(false));
        assert!(envelope["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    #[test]
    fn default_endpoint() {
        assert_eq!(GraphToolClient::default().endpoint(), "http://localhost:8051/mcp");
    }
}
