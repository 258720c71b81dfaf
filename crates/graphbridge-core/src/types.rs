//! Core data types shared across graphbridge.
//!
//! Everything in here is plain data: normalized graph elements that no longer
//! reference driver types, and the envelope every operation answers with.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, ErrorKind};

/// A string-keyed JSON object.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Property key to scalar (or array-of-scalar) value.
pub type PropertyMap = JsonObject;

// ── Graph Elements ────────────────────────────────────────────────

/// A node after normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeElement {
    /// Store-assigned identity. Opaque to callers.
    pub id: i64,
    pub labels: Vec<String>,
    pub properties: PropertyMap,
}

/// A relationship after normalization.
///
/// `start` and `end` are absent for relationships returned inside a path
/// segment, where the store does not bind the endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipElement {
    pub id: i64,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end: Option<i64>,
    pub properties: PropertyMap,
}

// ── Envelope ──────────────────────────────────────────────────────

/// The uniform wrapper returned by every operation.
///
/// Callers tell success from failure only through `success`; the remaining
/// keys are flattened from the payload.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(flatten)]
    pub payload: Payload,
}

/// Operation-specific envelope contents.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Records(RecordsPayload),
    CreatedNode(CreatedNodePayload),
    Nodes(NodesPayload),
    DatabaseInfo(DatabaseInfoPayload),
    Failure(FailurePayload),
}

/// Result of `run_query`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordsPayload {
    pub records: Vec<JsonObject>,
    pub count: usize,
    pub query: String,
}

/// Result of `create_node`. `node` holds the stored properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedNodePayload {
    pub node: PropertyMap,
    pub labels: Vec<String>,
    pub id: i64,
}

/// Result of `find_nodes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodesPayload {
    pub nodes: Vec<NodeElement>,
    pub count: usize,
    pub query: String,
}

/// Result of `get_database_info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseInfoPayload {
    pub database_info: JsonObject,
    pub node_labels: Vec<String>,
    pub relationship_types: Vec<String>,
    pub node_count: i64,
    pub relationship_count: i64,
}

/// Failure details plus the echoed request arguments.
#[derive(Debug, Clone, Serialize)]
pub struct FailurePayload {
    pub error: String,
    pub error_kind: ErrorKind,
    #[serde(flatten)]
    pub request: JsonObject,
}

/// Keys owned by the envelope itself; echoed arguments may not shadow them.
const RESERVED_KEYS: [&str; 3] = ["success", "error", "error_kind"];

impl Envelope {
    pub fn success(payload: Payload) -> Self {
        Self {
            success: true,
            payload,
        }
    }

    /// Build a failure envelope, echoing `request` for replay and debugging.
    pub fn failure(err: &BridgeError, mut request: JsonObject) -> Self {
        for key in RESERVED_KEYS {
            request.remove(key);
        }
        Self {
            success: false,
            payload: Payload::Failure(FailurePayload {
                error: err.to_string(),
                error_kind: err.kind(),
                request,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Number of records or nodes carried, if the payload has a count.
    pub fn count(&self) -> Option<usize> {
        match &self.payload {
            Payload::Records(p) => Some(p.count),
            Payload::Nodes(p) => Some(p.count),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.payload {
            Payload::Failure(f) => Some(f.error_kind),
            _ => None,
        }
    }

    /// Serialize to a JSON value for the transport.
    pub fn to_json(&self) -> serde_json::Value {
        // Every payload is built from JSON-safe types, so this cannot fail;
        // fall back to a bare failure rather than panic if it ever does.
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "success": false,
                "error": format!("Serialization error: {e}"),
                "error_kind": ErrorKind::Serialization,
            })
        })
    }
}
