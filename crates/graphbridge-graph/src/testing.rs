//! Scripted in-process backend for tests.
//!
//! A [`ScriptedConnector`] hands out backends that record every statement
//! they are asked to run and answer with whatever the responder closure
//! returns. Switches on the connector simulate connect failures, dropped
//! links, and slow statements.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use neo4rs::{BoltInteger, BoltList, BoltMap, BoltNode, BoltRelation, BoltString, BoltType};

use graphbridge_core::PropertyMap;

use crate::client::{json_to_bolt, Connector, GraphBackend, GraphError, RawRecord};
use crate::statements::Statement;

type Responder = dyn Fn(&Statement) -> Result<Vec<RawRecord>, GraphError> + Send + Sync;

#[derive(Default)]
struct Shared {
    statements: Mutex<Vec<Statement>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
    failing_connects: AtomicUsize,
    disconnected: AtomicBool,
    connect_delay: Mutex<Option<Duration>>,
    execute_delay: Mutex<Option<Duration>>,
}

/// Connector producing scripted backends that share one statement log.
#[derive(Clone)]
pub struct ScriptedConnector {
    shared: Arc<Shared>,
    responder: Arc<Responder>,
}

impl ScriptedConnector {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Statement) -> Result<Vec<RawRecord>, GraphError> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared::default()),
            responder: Arc::new(responder),
        }
    }

    /// A store that answers every statement with zero rows.
    pub fn empty() -> Self {
        Self::new(|_| Ok(Vec::new()))
    }

    /// Statements issued so far, in order.
    pub fn statements(&self) -> Vec<Statement> {
        lock(&self.shared.statements).clone()
    }

    pub fn connect_count(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Number of backends dropped, i.e. connections closed.
    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    pub fn fail_next_connects(&self, n: usize) {
        self.shared.failing_connects.store(n, Ordering::SeqCst);
    }

    /// While set, connects fail and existing backends error on execute.
    pub fn set_disconnected(&self, disconnected: bool) {
        self.shared.disconnected.store(disconnected, Ordering::SeqCst);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *lock(&self.shared.connect_delay) = Some(delay);
    }

    pub fn set_execute_delay(&self, delay: Duration) {
        *lock(&self.shared.execute_delay) = Some(delay);
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<Box<dyn GraphBackend>, GraphError> {
        let delay = *lock(&self.shared.connect_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.shared.connects.fetch_add(1, Ordering::SeqCst);

        let failing = self.shared.failing_connects.load(Ordering::SeqCst);
        if failing > 0 {
            self.shared
                .failing_connects
                .store(failing - 1, Ordering::SeqCst);
            return Err(GraphError::Connection("authentication failure".to_string()));
        }
        if self.shared.disconnected.load(Ordering::SeqCst) {
            return Err(GraphError::Connection("connection refused".to_string()));
        }

        Ok(Box::new(ScriptedBackend {
            shared: Arc::clone(&self.shared),
            responder: Arc::clone(&self.responder),
        }))
    }

    fn describe(&self) -> String {
        "scripted://memory".to_string()
    }
}

struct ScriptedBackend {
    shared: Arc<Shared>,
    responder: Arc<Responder>,
}

#[async_trait]
impl GraphBackend for ScriptedBackend {
    async fn execute(&self, statement: &Statement) -> Result<Vec<RawRecord>, GraphError> {
        lock(&self.shared.statements).push(statement.clone());

        if self.shared.disconnected.load(Ordering::SeqCst) {
            return Err(GraphError::Connection("connection reset by peer".to_string()));
        }
        let delay = *lock(&self.shared.execute_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(statement)
    }
}

impl Drop for ScriptedBackend {
    fn drop(&mut self) {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Value Builders ───────────────────────────────────────────────

/// Build a Bolt node from JSON properties.
pub fn bolt_node(id: i64, labels: &[&str], properties: &PropertyMap) -> BoltType {
    BoltType::Node(BoltNode {
        id: BoltInteger::new(id),
        labels: bolt_labels(labels),
        properties: bolt_map(properties),
    })
}

/// Build a bound Bolt relationship from JSON properties.
pub fn bolt_relation(
    id: i64,
    start: i64,
    end: i64,
    rel_type: &str,
    properties: &PropertyMap,
) -> BoltType {
    BoltType::Relation(BoltRelation {
        id: BoltInteger::new(id),
        start_node_id: BoltInteger::new(start),
        end_node_id: BoltInteger::new(end),
        typ: BoltString::from(rel_type),
        properties: bolt_map(properties),
    })
}

fn bolt_labels(labels: &[&str]) -> BoltList {
    BoltList::from(
        labels
            .iter()
            .map(|l| BoltType::from(*l))
            .collect::<Vec<_>>(),
    )
}

fn bolt_map(properties: &PropertyMap) -> BoltMap {
    let mut map = BoltMap::new();
    for (key, value) in properties {
        let value = json_to_bolt(value).unwrap_or(BoltType::from(value.to_string()));
        map.put(BoltString::from(key.as_str()), value);
    }
    map
}
