//! Cypher statement builder.
//!
//! Values always travel as bound parameters. Labels and property keys are
//! structural tokens that Cypher cannot parameterize, so they are checked
//! against a strict identifier pattern before they are written into text.

use std::collections::BTreeMap;

use serde_json::Value;

use graphbridge_core::{JsonObject, PropertyMap};

use crate::client::GraphError;

/// Row cap used by `find_nodes` when the caller does not pass one.
pub const DEFAULT_FIND_LIMIT: u32 = 10;

/// Statement text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: BTreeMap<String, Value>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

// ── Raw ──────────────────────────────────────────────────────────

/// Pass caller text through untouched, binding `params` alongside it.
pub fn raw(query: &str, params: Option<&JsonObject>) -> Result<Statement, GraphError> {
    if query.trim().is_empty() {
        return Err(GraphError::Validation("query must not be empty".to_string()));
    }
    let params = params
        .map(|p| p.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    Ok(Statement {
        text: query.to_string(),
        params,
    })
}

// ── Create ───────────────────────────────────────────────────────

/// `CREATE (n:Label {k: $k, ...}) RETURN n`
pub fn create_node(label: &str, properties: &PropertyMap) -> Result<Statement, GraphError> {
    validate_identifier("label", label)?;

    let mut statement = Statement::new(String::new());
    let mut assignments = Vec::with_capacity(properties.len());
    for (key, value) in sorted(properties) {
        validate_identifier("property key", key)?;
        validate_property_value(key, value)?;
        assignments.push(format!("{key}: ${key}"));
        statement.params.insert(key.clone(), value.clone());
    }

    statement.text = if assignments.is_empty() {
        format!("CREATE (n:{label}) RETURN n")
    } else {
        format!("CREATE (n:{label} {{{}}}) RETURN n", assignments.join(", "))
    };
    Ok(statement)
}

// ── Find ─────────────────────────────────────────────────────────

/// `MATCH (n[:Label]) [WHERE ...] RETURN n LIMIT $limit`
///
/// Filter values bind as `$f_<key>` so a property called `limit` cannot
/// collide with the row cap. An empty label is treated as no label.
pub fn find_nodes(
    label: Option<&str>,
    filter: Option<&PropertyMap>,
    limit: u32,
) -> Result<Statement, GraphError> {
    let match_clause = match label.filter(|l| !l.is_empty()) {
        Some(label) => {
            validate_identifier("label", label)?;
            format!("MATCH (n:{label})")
        }
        None => "MATCH (n)".to_string(),
    };

    let mut statement = Statement::new(String::new()).param("limit", limit);
    let mut predicates = Vec::new();
    for (key, value) in filter.map(sorted).unwrap_or_default() {
        validate_identifier("property key", key)?;
        validate_property_value(key, value)?;
        if value.is_null() {
            predicates.push(format!("n.{key} IS NULL"));
        } else {
            let param = format!("f_{key}");
            predicates.push(format!("n.{key} = ${param}"));
            statement.params.insert(param, value.clone());
        }
    }

    let where_clause = if predicates.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", predicates.join(" AND "))
    };
    statement.text = format!("{match_clause}{where_clause} RETURN n LIMIT $limit");
    Ok(statement)
}

// ── Info ─────────────────────────────────────────────────────────

/// Fixed introspection statements used by `get_database_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoStatement {
    DatabaseInfo,
    Labels,
    RelationshipTypes,
    NodeCount,
    RelationshipCount,
}

impl InfoStatement {
    pub const ALL: [InfoStatement; 5] = [
        InfoStatement::DatabaseInfo,
        InfoStatement::Labels,
        InfoStatement::RelationshipTypes,
        InfoStatement::NodeCount,
        InfoStatement::RelationshipCount,
    ];

    pub fn text(&self) -> &'static str {
        match self {
            Self::DatabaseInfo => "CALL db.info()",
            Self::Labels => "CALL db.labels()",
            Self::RelationshipTypes => "CALL db.relationshipTypes()",
            Self::NodeCount => "MATCH (n) RETURN count(n) AS count",
            Self::RelationshipCount => "MATCH ()-[r]->() RETURN count(r) AS count",
        }
    }

    /// Column carrying the interesting value. `None` for `db.info()`, whose
    /// whole row is the result.
    pub fn column(&self) -> Option<&'static str> {
        match self {
            Self::DatabaseInfo => None,
            Self::Labels => Some("label"),
            Self::RelationshipTypes => Some("relationshipType"),
            Self::NodeCount | Self::RelationshipCount => Some("count"),
        }
    }

    pub fn statement(&self) -> Statement {
        Statement::new(self.text())
    }
}

// ── Validation ───────────────────────────────────────────────────

/// Key-ordered view so statement text is deterministic.
fn sorted(map: &PropertyMap) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*` only.
pub fn validate_identifier(what: &str, ident: &str) -> Result<(), GraphError> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(GraphError::Validation(format!(
            "invalid {what} {ident:?}: must be non-empty, start with a letter or underscore, \
             and contain only letters, digits, and underscores"
        )))
    }
}

/// Stored properties are scalars or flat arrays of non-null scalars.
fn validate_property_value(key: &str, value: &Value) -> Result<(), GraphError> {
    match value {
        Value::Object(_) => Err(GraphError::Validation(format!(
            "property {key:?} is a map; only scalars and arrays of scalars can be stored"
        ))),
        Value::Array(items) => {
            if items.iter().any(|v| v.is_array() || v.is_object() || v.is_null()) {
                Err(GraphError::Validation(format!(
                    "property {key:?} must be an array of non-null scalars"
                )))
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}
