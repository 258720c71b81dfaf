//! Conversion of native Bolt values into plain JSON.
//!
//! Temporal values become ISO-8601 strings (zoned date-times carry the zone
//! name in brackets), durations become ISO-8601 `PT..S` strings, and points
//! become `{srid, x, y[, z]}` objects. A value that fails to convert is a
//! serialization error rather than a best-effort string.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use neo4rs::{BoltMap, BoltNode, BoltRelation, BoltType, BoltUnboundedRelation};
use serde::de::IntoDeserializer;
use serde::Deserialize;
use serde_json::{Number, Value};

use graphbridge_core::types::RelationshipElement;
use graphbridge_core::{JsonObject, NodeElement, PropertyMap};

use crate::client::{GraphError, RawRecord};

/// Normalize every column of a record.
pub fn normalize_record(record: &RawRecord) -> Result<JsonObject, GraphError> {
    let mut out = JsonObject::new();
    for (key, value) in record.fields() {
        out.insert(key.to_string(), normalize_value(value)?);
    }
    Ok(out)
}

/// Normalize a single value, recursing through collections and elements.
pub fn normalize_value(value: &BoltType) -> Result<Value, GraphError> {
    match value {
        BoltType::Null(_) => Ok(Value::Null),
        BoltType::Boolean(b) => Ok(Value::Bool(b.value)),
        BoltType::Integer(i) => Ok(Value::from(i.value)),
        BoltType::Float(f) => Number::from_f64(f.value).map(Value::Number).ok_or_else(|| {
            GraphError::Serialization(format!("non-finite float {} has no JSON form", f.value))
        }),
        BoltType::String(s) => Ok(Value::String(s.value.clone())),
        BoltType::Bytes(bytes) => Ok(Value::Array(
            bytes.value.iter().map(|b| Value::from(*b)).collect(),
        )),
        BoltType::List(list) => list
            .value
            .iter()
            .map(normalize_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        BoltType::Map(map) => normalize_map(map).map(Value::Object),
        BoltType::Node(node) => to_value(node_element(node)?),
        BoltType::Relation(rel) => to_value(relationship_element(rel)?),
        BoltType::UnboundedRelation(rel) => to_value(unbounded_relationship_element(rel)?),
        BoltType::Path(path) => {
            let nodes = path
                .nodes
                .value
                .iter()
                .map(normalize_value)
                .collect::<Result<Vec<_>, _>>()?;
            let relationships = path
                .rels
                .value
                .iter()
                .map(normalize_value)
                .collect::<Result<Vec<_>, _>>()?;
            let mut out = JsonObject::new();
            out.insert("nodes".to_string(), Value::Array(nodes));
            out.insert("relationships".to_string(), Value::Array(relationships));
            Ok(Value::Object(out))
        }
        BoltType::Date(date) => {
            let date = NaiveDate::try_from(date).map_err(|e| temporal_error("date", e))?;
            Ok(Value::String(date.to_string()))
        }
        BoltType::Time(time) => {
            let (time, offset) = <(NaiveTime, FixedOffset)>::from(time);
            Ok(Value::String(format!("{time}{offset}")))
        }
        BoltType::LocalTime(time) => Ok(Value::String(NaiveTime::from(time).to_string())),
        BoltType::DateTime(dt) => {
            let dt = DateTime::<FixedOffset>::try_from(dt)
                .map_err(|e| temporal_error("datetime", e))?;
            Ok(Value::String(dt.to_rfc3339()))
        }
        BoltType::LocalDateTime(dt) => {
            let dt = NaiveDateTime::try_from(dt)
                .map_err(|e| temporal_error("local datetime", e))?;
            Ok(Value::String(local_date_time(&dt)))
        }
        BoltType::DateTimeZoneId(dt) => {
            let zoned = DateTime::<FixedOffset>::try_from(dt)
                .map_err(|e| temporal_error("zoned datetime", e))?;
            Ok(Value::String(format!("{}[{}]", zoned.to_rfc3339(), dt.tz_id())))
        }
        BoltType::Duration(_) => {
            // Months and days are folded into seconds by the driver.
            let (seconds, nanoseconds) = <(i64, i64)>::deserialize(value.into_deserializer())
                .map_err(|e| temporal_error("duration", e))?;
            Ok(Value::String(iso_duration(seconds, nanoseconds)))
        }
        BoltType::Point2D(p) => {
            let mut out = JsonObject::new();
            out.insert("srid".to_string(), Value::from(p.sr_id.value));
            out.insert("x".to_string(), coordinate(p.x.value)?);
            out.insert("y".to_string(), coordinate(p.y.value)?);
            Ok(Value::Object(out))
        }
        BoltType::Point3D(p) => {
            let mut out = JsonObject::new();
            out.insert("srid".to_string(), Value::from(p.sr_id.value));
            out.insert("x".to_string(), coordinate(p.x.value)?);
            out.insert("y".to_string(), coordinate(p.y.value)?);
            out.insert("z".to_string(), coordinate(p.z.value)?);
            Ok(Value::Object(out))
        }
    }
}

fn temporal_error(kind: &str, e: impl std::fmt::Display) -> GraphError {
    GraphError::Serialization(format!("{kind} value out of range: {e}"))
}

fn local_date_time(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

fn coordinate(value: f64) -> Result<Value, GraphError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| GraphError::Serialization(format!("point coordinate {value} is not finite")))
}

/// `PT<seconds>[.<fraction>]S`, negated with a leading `-`.
fn iso_duration(seconds: i64, nanoseconds: i64) -> String {
    let total = i128::from(seconds) * 1_000_000_000 + i128::from(nanoseconds);
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    let whole = total / 1_000_000_000;
    let fraction = total % 1_000_000_000;
    if fraction == 0 {
        format!("{sign}PT{whole}S")
    } else {
        let digits = format!("{fraction:09}");
        format!("{sign}PT{whole}.{}S", digits.trim_end_matches('0'))
    }
}

/// Convert a driver node into the normalized element shape.
pub fn node_element(node: &BoltNode) -> Result<NodeElement, GraphError> {
    let labels = node
        .labels
        .value
        .iter()
        .map(|label| match label {
            BoltType::String(s) => Ok(s.value.clone()),
            other => Err(GraphError::Serialization(format!(
                "node label is `{}`, expected string",
                kind_name(other)
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NodeElement {
        id: node.id.value,
        labels,
        properties: normalize_map(&node.properties)?,
    })
}

pub fn relationship_element(rel: &BoltRelation) -> Result<RelationshipElement, GraphError> {
    Ok(RelationshipElement {
        id: rel.id.value,
        rel_type: rel.typ.value.clone(),
        start: Some(rel.start_node_id.value),
        end: Some(rel.end_node_id.value),
        properties: normalize_map(&rel.properties)?,
    })
}

fn unbounded_relationship_element(
    rel: &BoltUnboundedRelation,
) -> Result<RelationshipElement, GraphError> {
    Ok(RelationshipElement {
        id: rel.id.value,
        rel_type: rel.typ.value.clone(),
        start: None,
        end: None,
        properties: normalize_map(&rel.properties)?,
    })
}

/// Pull the node stored under `column`, failing if it is missing or not a node.
pub fn expect_node(record: &RawRecord, column: &str) -> Result<NodeElement, GraphError> {
    match record.get(column) {
        Some(BoltType::Node(node)) => node_element(node),
        Some(other) => Err(GraphError::Serialization(format!(
            "column `{column}` is `{}`, expected node",
            kind_name(other)
        ))),
        None => Err(GraphError::Serialization(format!(
            "column `{column}` missing from result"
        ))),
    }
}

pub fn expect_i64(record: &RawRecord, column: &str) -> Result<i64, GraphError> {
    match record.get(column) {
        Some(BoltType::Integer(i)) => Ok(i.value),
        Some(other) => Err(GraphError::Serialization(format!(
            "column `{column}` is `{}`, expected integer",
            kind_name(other)
        ))),
        None => Err(GraphError::Serialization(format!(
            "column `{column}` missing from result"
        ))),
    }
}

pub fn expect_string(record: &RawRecord, column: &str) -> Result<String, GraphError> {
    match record.get(column) {
        Some(BoltType::String(s)) => Ok(s.value.clone()),
        Some(other) => Err(GraphError::Serialization(format!(
            "column `{column}` is `{}`, expected string",
            kind_name(other)
        ))),
        None => Err(GraphError::Serialization(format!(
            "column `{column}` missing from result"
        ))),
    }
}

fn normalize_map(map: &BoltMap) -> Result<PropertyMap, GraphError> {
    let mut out = PropertyMap::new();
    for (key, value) in &map.value {
        out.insert(key.value.clone(), normalize_value(value)?);
    }
    Ok(out)
}

fn to_value<T: serde::Serialize>(element: T) -> Result<Value, GraphError> {
    serde_json::to_value(element).map_err(|e| GraphError::Serialization(e.to_string()))
}

/// Variant name of a Bolt value, for error messages.
fn kind_name(value: &BoltType) -> String {
    let debug = format!("{value:?}");
    debug
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or("unknown")
        .to_string()
}
