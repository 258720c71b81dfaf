//! Neo4j connection handling and the backend seam the rest of the bridge runs on.

use std::time::Duration;

use async_trait::async_trait;
use neo4rs::{BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph, Query};
use serde_json::Value;

use graphbridge_core::config::Neo4jSettings;
use graphbridge_core::BridgeError;

use crate::statements::Statement;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(neo4rs::Error),

    #[error("Store rejected statement: {0}")]
    Execution(String),

    #[error("Statement timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Invalid statement input: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GraphError {
    /// True when the failure says nothing about the statement and everything
    /// about the link to the store.
    pub fn is_connection(&self) -> bool {
        matches!(self, GraphError::Connection(_))
    }
}

impl From<neo4rs::Error> for GraphError {
    fn from(e: neo4rs::Error) -> Self {
        match e {
            neo4rs::Error::IOError { .. }
            | neo4rs::Error::ConnectionError { .. }
            | neo4rs::Error::AuthenticationError { .. } => GraphError::Connection(e.to_string()),
            other => GraphError::Query(other),
        }
    }
}

impl From<GraphError> for BridgeError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::Connection(_) => BridgeError::Connection(e.to_string()),
            GraphError::Query(_) | GraphError::Execution(_) | GraphError::Timeout(_) => {
                BridgeError::Execution(e.to_string())
            }
            GraphError::Validation(msg) => BridgeError::Validation(msg),
            GraphError::Serialization(msg) => BridgeError::Serialization(msg),
        }
    }
}

// ── Backend Seam ─────────────────────────────────────────────────

/// One row as returned by the store: ordered column name to native value.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    fields: Vec<(String, BoltType)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append of one column.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<BoltType>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<BoltType>) {
        self.fields.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&BoltType> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &BoltType)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Something that can run one statement in its own store session.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    async fn execute(&self, statement: &Statement) -> Result<Vec<RawRecord>, GraphError>;
}

/// Factory for backends, invoked by the connection manager on first use.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn GraphBackend>, GraphError>;

    /// Where this connector points, for logs.
    fn describe(&self) -> String {
        "graph store".to_string()
    }
}

// ── Neo4j ────────────────────────────────────────────────────────

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl From<&Neo4jSettings> for GraphConfig {
    fn from(settings: &Neo4jSettings) -> Self {
        Self {
            uri: settings.uri.clone(),
            user: settings.user.clone(),
            password: settings.password.clone(),
            max_connections: settings.max_connections,
            fetch_size: settings.fetch_size,
        }
    }
}

/// Thread-safe Neo4j client backed by the driver's connection pool.
///
/// Each `execute` borrows a pooled connection for the duration of one
/// statement, so concurrent callers get independent sessions. Clone is cheap
/// (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Execute a query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}

#[async_trait]
impl GraphBackend for GraphClient {
    async fn execute(&self, statement: &Statement) -> Result<Vec<RawRecord>, GraphError> {
        let query = to_query(statement)?;
        let rows = self.query_rows(query).await?;
        rows.iter().map(row_to_record).collect()
    }
}

/// Connector that opens a [`GraphClient`] from static configuration.
#[derive(Debug, Clone)]
pub struct Neo4jConnector {
    config: GraphConfig,
}

impl Neo4jConnector {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for Neo4jConnector {
    async fn connect(&self) -> Result<Box<dyn GraphBackend>, GraphError> {
        let client = GraphClient::connect(&self.config).await?;
        Ok(Box::new(client))
    }

    fn describe(&self) -> String {
        self.config.uri.clone()
    }
}

// ── Conversions ──────────────────────────────────────────────────

/// Bind a built statement to a driver query.
pub fn to_query(statement: &Statement) -> Result<Query, GraphError> {
    let mut q = neo4rs::query(&statement.text);
    for (key, value) in &statement.params {
        q = q.param(key, json_to_bolt(value)?);
    }
    Ok(q)
}

/// Convert a JSON parameter value into its Bolt equivalent.
pub fn json_to_bolt(value: &Value) -> Result<BoltType, GraphError> {
    Ok(match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BoltType::from(i)
            } else if n.is_u64() {
                return Err(GraphError::Validation(format!(
                    "integer {n} exceeds the 64-bit signed range"
                )));
            } else if let Some(f) = n.as_f64() {
                BoltType::from(f)
            } else {
                return Err(GraphError::Validation(format!(
                    "number {n} is not representable as a parameter"
                )));
            }
        }
        Value::String(s) => BoltType::from(s.as_str()),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(json_to_bolt)
                .collect::<Result<Vec<_>, _>>()?;
            BoltType::List(BoltList::from(items))
        }
        Value::Object(map) => {
            let mut bolt = BoltMap::new();
            for (k, v) in map {
                bolt.put(BoltString::from(k.as_str()), json_to_bolt(v)?);
            }
            BoltType::Map(bolt)
        }
    })
}

/// Columns come back keyed by name; the driver keeps no column order, so
/// fields are sorted by name.
fn row_to_record(row: &neo4rs::Row) -> Result<RawRecord, GraphError> {
    let columns: BoltMap = row
        .to()
        .map_err(|e| GraphError::Serialization(format!("Failed to read row: {e}")))?;

    let mut fields: Vec<_> = columns.value.into_iter().collect();
    fields.sort_by(|a, b| a.0.value.cmp(&b.0.value));

    let mut record = RawRecord::new();
    for (key, value) in fields {
        record.push(key.value, value);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_scalars_convert() {
        assert_eq!(json_to_bolt(&json!(36)).unwrap(), BoltType::from(36_i64));
        assert_eq!(json_to_bolt(&json!(1.5)).unwrap(), BoltType::from(1.5_f64));
        assert_eq!(json_to_bolt(&json!("Ada")).unwrap(), BoltType::from("Ada"));
        assert_eq!(json_to_bolt(&json!(true)).unwrap(), BoltType::from(true));
        assert_eq!(json_to_bolt(&json!(null)).unwrap(), BoltType::Null(BoltNull));
    }

    #[test]
    fn integers_beyond_i64_are_rejected() {
        assert!(matches!(
            json_to_bolt(&json!(u64::MAX)),
            Err(GraphError::Validation(_))
        ));
        assert!(matches!(
            json_to_bolt(&json!([1, u64::MAX])),
            Err(GraphError::Validation(_))
        ));
        assert_eq!(
            json_to_bolt(&json!(i64::MAX)).unwrap(),
            BoltType::from(i64::MAX)
        );
    }

    #[test]
    fn json_collections_convert() {
        match json_to_bolt(&json!(["a", "b"])).unwrap() {
            BoltType::List(list) => assert_eq!(list.value.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
        match json_to_bolt(&json!({"k": {"nested": 1}})).unwrap() {
            BoltType::Map(map) => assert_eq!(map.value.len(), 1),
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn graph_errors_map_to_bridge_kinds() {
        use graphbridge_core::ErrorKind;

        let cases = [
            (GraphError::Connection("down".into()), ErrorKind::Connection),
            (GraphError::Execution("syntax".into()), ErrorKind::Execution),
            (GraphError::Timeout(Duration::from_secs(3)), ErrorKind::Execution),
            (GraphError::Validation("label".into()), ErrorKind::Validation),
            (GraphError::Serialization("point".into()), ErrorKind::Serialization),
        ];
        for (err, kind) in cases {
            assert_eq!(BridgeError::from(err).kind(), kind);
        }
    }

    #[test]
    fn timeout_message_mentions_seconds() {
        let msg = GraphError::Timeout(Duration::from_secs(30)).to_string();
        assert_eq!(msg, "Statement timed out after 30s");
    }

    #[test]
    fn record_lookup_by_column() {
        let record = RawRecord::new().with("c", 3_i64).with("name", "Ada");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("c"), Some(&BoltType::from(3_i64)));
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn driver_row_keeps_node_and_scalar_columns() {
        use crate::normalize::{expect_i64, expect_node};
        use crate::testing::bolt_node;
        use graphbridge_core::NodeElement;

        let props = json!({"name": "Ada"}).as_object().cloned().unwrap();
        let row = neo4rs::Row::new(
            BoltList::from(vec![BoltType::from("n"), BoltType::from("c")]),
            BoltList::from(vec![bolt_node(5, &["Person"], &props), BoltType::from(3_i64)]),
        );

        let record = row_to_record(&row).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(
            expect_node(&record, "n").unwrap(),
            NodeElement {
                id: 5,
                labels: vec!["Person".to_string()],
                properties: props,
            }
        );
        assert_eq!(expect_i64(&record, "c").unwrap(), 3);
        assert_eq!(record.fields().map(|(k, _)| k).collect::<Vec<_>>(), ["c", "n"]);
    }
}
