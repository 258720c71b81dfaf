//! Operation dispatch.
//!
//! The dispatcher validates a request, builds its statements, runs them on
//! the shared connection, and folds every outcome into an [`Envelope`]. No
//! error escapes as anything but a failure envelope.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;
use uuid::Uuid;

use graphbridge_core::types::{
    CreatedNodePayload, DatabaseInfoPayload, NodesPayload, RecordsPayload,
};
use graphbridge_core::{BridgeError, Envelope, JsonObject, Payload};
use graphbridge_graph::normalize::{expect_i64, expect_node, expect_string, normalize_record};
use graphbridge_graph::statements::{self, InfoStatement};
use graphbridge_graph::{Connection, ConnectionManager, GraphError, RawRecord, Statement};

use crate::operations::{CreateNodeArgs, FindNodesArgs, Operation, RunQueryArgs};

pub struct Dispatcher {
    connections: Arc<ConnectionManager>,
    statement_timeout: Duration,
}

impl Dispatcher {
    pub fn new(connections: Arc<ConnectionManager>, statement_timeout: Duration) -> Self {
        Self {
            connections,
            statement_timeout,
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Validate and run a named operation.
    ///
    /// Arguments that fail validation are echoed back as received.
    pub async fn invoke(&self, name: &str, arguments: Option<JsonObject>) -> Envelope {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("invoke", %request_id, operation = name);

        async move {
            tracing::debug!("Invocation received");
            match Operation::parse(name, arguments.clone()) {
                Ok(operation) => self.dispatch(operation).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Invocation rejected");
                    Envelope::failure(&e, arguments.unwrap_or_default())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run an already validated operation.
    pub async fn dispatch(&self, operation: Operation) -> Envelope {
        let started = Instant::now();
        tracing::debug!(operation = %operation.name(), "Invocation validated");

        let outcome = match &operation {
            Operation::RunQuery(args) => self.run_query(args).await,
            Operation::CreateNode(args) => self.create_node(args).await,
            Operation::FindNodes(args) => self.find_nodes(args).await,
            Operation::GetDatabaseInfo => self.database_info().await,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(payload) => {
                let envelope = Envelope::success(payload);
                tracing::info!(
                    operation = %operation.name(),
                    elapsed_ms,
                    count = envelope.count(),
                    "Invocation succeeded"
                );
                envelope
            }
            Err(e) => {
                tracing::warn!(
                    operation = %operation.name(),
                    elapsed_ms,
                    error = %e,
                    error_kind = ?e.kind(),
                    "Invocation failed"
                );
                Envelope::failure(&e, operation.echo())
            }
        }
    }

    async fn run_query(&self, args: &RunQueryArgs) -> Result<Payload, BridgeError> {
        let statement = statements::raw(&args.query, args.parameters.as_ref())?;
        let rows = self.run(&statement).await?;
        let records = rows
            .iter()
            .map(normalize_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Payload::Records(RecordsPayload {
            count: records.len(),
            records,
            query: args.query.clone(),
        }))
    }

    async fn create_node(&self, args: &CreateNodeArgs) -> Result<Payload, BridgeError> {
        let statement = statements::create_node(&args.label, &args.properties)?;
        let rows = self.run(&statement).await?;
        let row = rows.first().ok_or_else(|| {
            BridgeError::Execution("CREATE returned no rows".to_string())
        })?;
        let node = expect_node(row, "n")?;

        Ok(Payload::CreatedNode(CreatedNodePayload {
            node: node.properties,
            labels: node.labels,
            id: node.id,
        }))
    }

    async fn find_nodes(&self, args: &FindNodesArgs) -> Result<Payload, BridgeError> {
        let statement = statements::find_nodes(
            args.label.as_deref(),
            args.properties.as_ref(),
            args.limit(),
        )?;
        let rows = self.run(&statement).await?;
        let nodes = rows
            .iter()
            .map(|row| expect_node(row, "n"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Payload::Nodes(NodesPayload {
            count: nodes.len(),
            nodes,
            query: statement.text,
        }))
    }

    async fn database_info(&self) -> Result<Payload, BridgeError> {
        let conn = self.connections.acquire().await?;

        let info_rows = self.run_on(&conn, &InfoStatement::DatabaseInfo.statement()).await?;
        let database_info = match info_rows.first() {
            Some(row) => normalize_record(row)?,
            None => JsonObject::new(),
        };
        let node_labels = self.strings(&conn, InfoStatement::Labels).await?;
        let relationship_types = self.strings(&conn, InfoStatement::RelationshipTypes).await?;
        let node_count = self.count(&conn, InfoStatement::NodeCount).await?;
        let relationship_count = self.count(&conn, InfoStatement::RelationshipCount).await?;

        Ok(Payload::DatabaseInfo(DatabaseInfoPayload {
            database_info,
            node_labels,
            relationship_types,
            node_count,
            relationship_count,
        }))
    }

    async fn strings(
        &self,
        conn: &Connection,
        info: InfoStatement,
    ) -> Result<Vec<String>, BridgeError> {
        let column = info.column().unwrap_or_default();
        let rows = self.run_on(conn, &info.statement()).await?;
        let values = rows
            .iter()
            .map(|row| expect_string(row, column))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    async fn count(&self, conn: &Connection, info: InfoStatement) -> Result<i64, BridgeError> {
        let column = info.column().unwrap_or_default();
        let rows = self.run_on(conn, &info.statement()).await?;
        match rows.first() {
            Some(row) => Ok(expect_i64(row, column)?),
            None => Ok(0),
        }
    }

    async fn run(&self, statement: &Statement) -> Result<Vec<RawRecord>, BridgeError> {
        let conn = self.connections.acquire().await?;
        self.run_on(&conn, statement).await
    }

    /// Execute under the statement timeout. A connection-level failure
    /// invalidates the handle so the next invocation reconnects.
    async fn run_on(
        &self,
        conn: &Connection,
        statement: &Statement,
    ) -> Result<Vec<RawRecord>, BridgeError> {
        tracing::debug!(
            statement = %statement.text,
            params = statement.params.len(),
            generation = conn.generation(),
            "Executing statement"
        );

        let result = match tokio::time::timeout(self.statement_timeout, conn.execute(statement))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(GraphError::Timeout(self.statement_timeout)),
        };

        if let Err(e) = &result {
            if e.is_connection() {
                self.connections.invalidate(conn.generation());
            }
        }
        Ok(result?)
    }
}
