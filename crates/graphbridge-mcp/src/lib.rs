//! graphbridge-mcp: the MCP tool server and its client shim.
//!
//! - [`operations`]: argument schemas and request validation
//! - [`dispatcher`]: runs validated operations and builds envelopes
//! - [`server`]: the MCP `ServerHandler` exposing operations as tools
//! - [`http`]: streamable HTTP transport and health endpoint
//! - [`client`]: remote invocation over the same transport

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod operations;
pub mod server;

pub use client::GraphToolClient;
pub use dispatcher::Dispatcher;
pub use error::{ClientError, ServerError};
pub use operations::{Operation, OperationName};
pub use server::GraphToolServer;
