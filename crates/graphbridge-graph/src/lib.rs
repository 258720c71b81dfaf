//! graphbridge-graph — the translation layer between operation requests and Neo4j.
//!
//! Every statement the bridge sends to the store is built here, executed
//! through the shared connection owned by [`ConnectionManager`], and its rows
//! are normalized into plain JSON before leaving this crate. Driver types
//! never cross the crate boundary in results.

pub mod client;
pub mod connection;
pub mod normalize;
pub mod statements;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{
    Connector, GraphBackend, GraphClient, GraphConfig, GraphError, Neo4jConnector, RawRecord,
};
pub use connection::{Connection, ConnectionManager};
pub use statements::{InfoStatement, Statement, DEFAULT_FIND_LIMIT};
