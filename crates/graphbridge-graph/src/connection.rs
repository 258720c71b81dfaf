//! Lazily created, shared store connection with an explicit lifecycle.
//!
//! The manager is an owned value (callers hold it in an `Arc`), not a global.
//! Creation goes through an async mutex so concurrent first callers share a
//! single connect; once published, the handle is read from an `ArcSwapOption`
//! without taking any lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::client::{Connector, GraphBackend, GraphError, RawRecord};
use crate::statements::Statement;

/// A live handle to the store.
pub struct Connection {
    backend: Box<dyn GraphBackend>,
    generation: u64,
    connected_at: DateTime<Utc>,
}

impl Connection {
    /// Run one statement in its own store session.
    pub async fn execute(&self, statement: &Statement) -> Result<Vec<RawRecord>, GraphError> {
        self.backend.execute(statement).await
    }

    /// Monotonic counter distinguishing successive connections.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("generation", &self.generation)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

/// Owns the single shared [`Connection`].
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    slot: ArcSwapOption<Connection>,
    init: Mutex<()>,
    generations: AtomicU64,
}

impl ConnectionManager {
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            slot: ArcSwapOption::empty(),
            init: Mutex::new(()),
            generations: AtomicU64::new(0),
        }
    }

    /// Return the shared connection, connecting on first use.
    ///
    /// A failed connect leaves the slot empty, so the next call tries again.
    pub async fn acquire(&self) -> Result<Arc<Connection>, GraphError> {
        if let Some(conn) = self.slot.load_full() {
            return Ok(conn);
        }

        let _guard = self.init.lock().await;
        // Another caller may have finished connecting while we waited.
        if let Some(conn) = self.slot.load_full() {
            return Ok(conn);
        }

        let target = self.connector.describe();
        let backend = match self.connector.connect().await {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(target_store = %target, error = %e, "Graph store connection failed");
                return Err(match e {
                    GraphError::Connection(_) => e,
                    other => GraphError::Connection(other.to_string()),
                });
            }
        };

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let conn = Arc::new(Connection {
            backend,
            generation,
            connected_at: Utc::now(),
        });
        self.slot.store(Some(Arc::clone(&conn)));
        tracing::info!(target_store = %target, generation, "Graph store connection established");
        Ok(conn)
    }

    /// Close the shared connection. A later [`acquire`](Self::acquire)
    /// reconnects. Returns whether a connection was held.
    ///
    /// Invocations already holding the handle finish on it; the underlying
    /// driver pool closes when the last of them drops it.
    pub async fn release(&self) -> bool {
        let _guard = self.init.lock().await;
        match self.slot.swap(None) {
            Some(conn) => {
                tracing::info!(generation = conn.generation, "Graph store connection released");
                true
            }
            None => false,
        }
    }

    /// Drop the connection of `generation` if it is still the current one.
    ///
    /// Called after a connection-level failure so the next invocation
    /// reconnects instead of reusing a dead handle.
    pub fn invalidate(&self, generation: u64) -> bool {
        let previous = self.slot.rcu(|current| match current {
            Some(conn) if conn.generation == generation => None,
            other => other.clone(),
        });
        let invalidated = matches!(&previous, Some(conn) if conn.generation == generation);
        if invalidated {
            tracing::warn!(generation, "Graph store connection invalidated");
        }
        invalidated
    }

    pub fn is_connected(&self) -> bool {
        self.slot.load().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConnector;
    use std::time::Duration;

    #[tokio::test]
    async fn acquire_connects_once_and_reuses() {
        let connector = ScriptedConnector::empty();
        let manager = ConnectionManager::new(connector.clone());

        let first = manager.acquire().await.unwrap();
        let second = manager.acquire().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connect_count(), 1);
        assert_eq!(first.generation(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_callers_share_one_connect() {
        let connector = ScriptedConnector::empty();
        connector.set_connect_delay(Duration::from_millis(50));
        let manager = Arc::new(ConnectionManager::new(connector.clone()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                manager.acquire().await.unwrap().generation()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 1);
        }
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn release_closes_and_next_acquire_recreates() {
        let connector = ScriptedConnector::empty();
        let manager = ConnectionManager::new(connector.clone());

        let conn = manager.acquire().await.unwrap();
        drop(conn);
        assert!(manager.release().await);
        assert!(!manager.is_connected());
        assert_eq!(connector.close_count(), 1);

        let conn = manager.acquire().await.unwrap();
        assert_eq!(conn.generation(), 2);
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test]
    async fn release_without_connection_is_noop() {
        let manager = ConnectionManager::new(ScriptedConnector::empty());
        assert!(!manager.release().await);
    }

    #[tokio::test]
    async fn connect_failure_surfaces_and_is_retried() {
        let connector = ScriptedConnector::empty();
        connector.fail_next_connects(1);
        let manager = ConnectionManager::new(connector.clone());

        let err = manager.acquire().await.unwrap_err();
        assert!(err.is_connection());
        assert!(!manager.is_connected());

        manager.acquire().await.unwrap();
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test]
    async fn invalidate_only_drops_matching_generation() {
        let connector = ScriptedConnector::empty();
        let manager = ConnectionManager::new(connector.clone());

        let conn = manager.acquire().await.unwrap();
        assert!(!manager.invalidate(conn.generation() + 1));
        assert!(manager.is_connected());

        assert!(manager.invalidate(conn.generation()));
        assert!(!manager.is_connected());
        assert!(!manager.invalidate(conn.generation()));
    }
}
