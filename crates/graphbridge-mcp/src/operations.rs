//! Operation schemas.
//!
//! Each operation's accepted arguments are an explicit struct; a request is
//! parsed into the [`Operation`] sum type before anything else happens.
//! Unknown fields, missing required fields, and mistyped values are all
//! rejected here as validation errors.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use graphbridge_core::{BridgeError, JsonObject, PropertyMap};
use graphbridge_graph::DEFAULT_FIND_LIMIT;

/// Arguments for `run_query`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RunQueryArgs {
    /// The Cypher query to execute. Use `$name` placeholders for values.
    pub query: String,
    /// Values for the query's `$name` placeholders.
    #[serde(default)]
    pub parameters: Option<JsonObject>,
}

/// Arguments for `create_node`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateNodeArgs {
    /// Node label (e.g. Person, Company). Letters, digits, and underscores only.
    pub label: String,
    /// Node properties as key-value pairs. Values must be scalars or arrays of scalars.
    pub properties: PropertyMap,
}

/// Arguments for `find_nodes`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FindNodesArgs {
    /// Node label to filter by.
    #[serde(default)]
    pub label: Option<String>,
    /// Properties the node must have, matched by equality.
    #[serde(default)]
    pub properties: Option<PropertyMap>,
    /// Maximum number of nodes to return (default: 10).
    #[serde(default)]
    pub limit: Option<u32>,
}

impl FindNodesArgs {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_FIND_LIMIT)
    }
}

/// `get_database_info` takes no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DatabaseInfoArgs {}

// ── Names ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationName {
    RunQuery,
    CreateNode,
    FindNodes,
    GetDatabaseInfo,
}

impl OperationName {
    pub const ALL: [OperationName; 4] = [
        OperationName::RunQuery,
        OperationName::CreateNode,
        OperationName::FindNodes,
        OperationName::GetDatabaseInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunQuery => "run_query",
            Self::CreateNode => "create_node",
            Self::FindNodes => "find_nodes",
            Self::GetDatabaseInfo => "get_database_info",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::RunQuery => {
                "Execute a Cypher query against the Neo4j database. Pass values through \
                 `parameters` and reference them as `$name` in the query. Returns the \
                 records, their count, and the query."
            }
            Self::CreateNode => {
                "Create a new node with the given label and properties. Returns the \
                 node's properties, labels, and id."
            }
            Self::FindNodes => {
                "Find nodes by label and/or exact property values. Returns up to `limit` \
                 nodes (default 10) with their properties, labels, and ids."
            }
            Self::GetDatabaseInfo => {
                "Get an overview of the database: node labels, relationship types, node \
                 count, and relationship count."
            }
        }
    }

    /// JSON Schema for this operation's arguments.
    pub fn input_schema(&self) -> JsonObject {
        match self {
            Self::RunQuery => schema_object::<RunQueryArgs>(),
            Self::CreateNode => schema_object::<CreateNodeArgs>(),
            Self::FindNodes => schema_object::<FindNodesArgs>(),
            Self::GetDatabaseInfo => schema_object::<DatabaseInfoArgs>(),
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationName {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run_query" | "run_cypher_query" => Ok(Self::RunQuery),
            "create_node" => Ok(Self::CreateNode),
            "find_nodes" => Ok(Self::FindNodes),
            "get_database_info" => Ok(Self::GetDatabaseInfo),
            other => Err(BridgeError::Validation(format!(
                "unknown operation {other:?}; expected one of: run_query, create_node, \
                 find_nodes, get_database_info"
            ))),
        }
    }
}

// ── Operation ────────────────────────────────────────────────────

/// A validated request.
#[derive(Debug, Clone)]
pub enum Operation {
    RunQuery(RunQueryArgs),
    CreateNode(CreateNodeArgs),
    FindNodes(FindNodesArgs),
    GetDatabaseInfo,
}

impl Operation {
    /// Validate a name and loosely-typed argument map against the schemas.
    pub fn parse(name: &str, arguments: Option<JsonObject>) -> Result<Self, BridgeError> {
        let op = name.parse::<OperationName>()?;
        let args = Value::Object(arguments.unwrap_or_default());
        let invalid = |e: serde_json::Error| {
            BridgeError::Validation(format!("invalid arguments for {op}: {e}"))
        };

        Ok(match op {
            OperationName::RunQuery => {
                Operation::RunQuery(serde_json::from_value(args).map_err(invalid)?)
            }
            OperationName::CreateNode => {
                Operation::CreateNode(serde_json::from_value(args).map_err(invalid)?)
            }
            OperationName::FindNodes => {
                Operation::FindNodes(serde_json::from_value(args).map_err(invalid)?)
            }
            OperationName::GetDatabaseInfo => {
                serde_json::from_value::<DatabaseInfoArgs>(args).map_err(invalid)?;
                Operation::GetDatabaseInfo
            }
        })
    }

    pub fn name(&self) -> OperationName {
        match self {
            Self::RunQuery(_) => OperationName::RunQuery,
            Self::CreateNode(_) => OperationName::CreateNode,
            Self::FindNodes(_) => OperationName::FindNodes,
            Self::GetDatabaseInfo => OperationName::GetDatabaseInfo,
        }
    }

    /// The request arguments to echo back in a failure envelope.
    pub fn echo(&self) -> JsonObject {
        let mut echo = JsonObject::new();
        match self {
            Self::RunQuery(args) => {
                echo.insert("query".into(), Value::String(args.query.clone()));
                echo.insert(
                    "parameters".into(),
                    Value::Object(args.parameters.clone().unwrap_or_default()),
                );
            }
            Self::CreateNode(args) => {
                echo.insert("label".into(), Value::String(args.label.clone()));
                echo.insert("properties".into(), Value::Object(args.properties.clone()));
            }
            Self::FindNodes(args) => {
                echo.insert(
                    "label".into(),
                    args.label.clone().map(Value::String).unwrap_or(Value::Null),
                );
                echo.insert(
                    "properties".into(),
                    args.properties.clone().map(Value::Object).unwrap_or(Value::Null),
                );
                echo.insert("limit".into(), Value::from(args.limit()));
            }
            Self::GetDatabaseInfo => {}
        }
        echo
    }
}

fn schema_object<T: JsonSchema>() -> JsonObject {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(map)) => map,
        _ => JsonObject::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    #[test]
    fn parses_each_operation() {
        let op = Operation::parse("run_query", args(json!({"query": "RETURN 1"}))).unwrap();
        assert_eq!(op.name(), OperationName::RunQuery);

        let op = Operation::parse(
            "create_node",
            args(json!({"label": "Person", "properties": {"name": "Ada"}})),
        )
        .unwrap();
        assert_eq!(op.name(), OperationName::CreateNode);

        let op = Operation::parse("find_nodes", None).unwrap();
        match op {
            Operation::FindNodes(a) => {
                assert_eq!(a.limit(), 10);
                assert!(a.label.is_none());
                assert!(a.properties.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }

        let op = Operation::parse("get_database_info", args(json!({}))).unwrap();
        assert_eq!(op.name(), OperationName::GetDatabaseInfo);
    }

    #[test]
    fn legacy_query_name_is_accepted() {
        let op = Operation::parse("run_cypher_query", args(json!({"query": "RETURN 1"}))).unwrap();
        assert_eq!(op.name(), OperationName::RunQuery);
    }

    #[test]
    fn explicit_nulls_fall_back_to_defaults() {
        let op = Operation::parse(
            "find_nodes",
            args(json!({"label": null, "properties": null, "limit": null})),
        )
        .unwrap();
        match op {
            Operation::FindNodes(a) => assert_eq!(a.limit(), 10),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_required_field_is_validation_error() {
        let err = Operation::parse("create_node", args(json!({"label": "Person"}))).unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
        assert!(err.to_string().contains("properties"), "{err}");
    }

    #[test]
    fn mistyped_field_is_validation_error() {
        let err = Operation::parse("find_nodes", args(json!({"limit": "ten"}))).unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));

        let err = Operation::parse("find_nodes", args(json!({"limit": -1}))).unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Operation::parse(
            "run_query",
            args(json!({"query": "RETURN 1", "timeout": 5})),
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));

        let err = Operation::parse("get_database_info", args(json!({"verbose": true}))).unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
    }

    #[test]
    fn unknown_operation_is_validation_error() {
        let err = Operation::parse("drop_database", None).unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
    }

    #[test]
    fn schemas_are_objects_with_required_fields() {
        let schema = OperationName::CreateNode.input_schema();
        assert_eq!(schema.get("type"), Some(&json!("object")));
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("label")));
        assert!(required.contains(&json!("properties")));

        let schema = OperationName::FindNodes.input_schema();
        assert!(schema
            .get("required")
            .and_then(Value::as_array)
            .map_or(true, |r| r.is_empty()));
    }

    #[test]
    fn echo_carries_replayable_arguments() {
        let op = Operation::parse(
            "find_nodes",
            args(json!({"label": "Person", "properties": {"name": "Ada"}})),
        )
        .unwrap();
        let echo = op.echo();
        assert_eq!(echo["label"], json!("Person"));
        assert_eq!(echo["properties"], json!({"name": "Ada"}));
        assert_eq!(echo["limit"], json!(10));
    }
}
