//! MCP tool surface.
//!
//! Exposes the four operations as MCP tools. Every tool call answers with a
//! single text content holding the JSON envelope; protocol-level errors are
//! reserved for malformed MCP traffic, never for operation failures.

use std::future::Future;
use std::sync::Arc;

use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer, ServerHandler,
};

use graphbridge_core::JsonObject;

use crate::dispatcher::Dispatcher;
use crate::operations::OperationName;

const INSTRUCTIONS: &str = "Tools for reading and writing a Neo4j graph database. \
Use get_database_info to discover labels and relationship types, find_nodes and \
create_node for simple node work, and run_query for arbitrary Cypher. Every tool \
returns a JSON object whose `success` field tells whether the call worked.";

#[derive(Clone)]
pub struct GraphToolServer {
    dispatcher: Arc<Dispatcher>,
}

impl GraphToolServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The advertised tool set, one per operation.
    pub fn tools() -> Vec<Tool> {
        OperationName::ALL
            .iter()
            .map(|op| Tool::new(op.as_str(), op.description(), Arc::new(op.input_schema())))
            .collect()
    }

    /// Run one tool call and wrap the envelope as text content.
    pub async fn handle_call(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let envelope = self.dispatcher.invoke(name, arguments).await;
        CallToolResult::success(vec![Content::text(envelope.to_json().to_string())])
    }
}

impl ServerHandler for GraphToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListToolsResult {
                tools: Self::tools(),
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move { Ok(self.handle_call(&request.name, request.arguments).await) }
    }
}
