//! Store connection management for the garden graph.
//!
//! The underlying Bolt client is not documented as safe to share one
//! logical session across concurrent callers, so the manager hands out
//! a fresh connection per operation; the caller releases it by
//! dropping it. The manager itself never fails construction — an
//! unreachable store flips it into the unavailable state, and every
//! store-dependent operation checks that state instead of erroring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use neo4rs::{query, ConfigBuilder, Graph, Query, Row};

/// Errors from graph store operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Configuration for connecting to the graph store.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "verdant-dev".to_string(),
            max_connections: 16,
            fetch_size: 256,
        }
    }
}

/// A single-caller connection to the store.
///
/// Obtained from [`StoreManager::open`] and released on drop; ownership
/// makes double-close impossible rather than merely a no-op.
pub struct StoreConnection {
    graph: Graph,
}

impl StoreConnection {
    /// Execute a write-only statement (CREATE, DELETE, SET).
    pub async fn run(&self, q: Query) -> Result<(), GraphError> {
        self.graph.run(q).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, q: Query) -> Result<Vec<Row>, GraphError> {
        let mut stream = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, q: Query) -> Result<Option<Row>, GraphError> {
        let mut stream = self.graph.execute(q).await?;
        Ok(stream.next().await?)
    }

    /// Whether the query matches at least one row.
    pub async fn exists(&self, q: Query) -> Result<bool, GraphError> {
        Ok(self.query_one(q).await?.is_some())
    }
}

/// Parameter value for ad hoc queries: a flat key→value map entry.
#[derive(Debug, Clone)]
pub enum Param {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Forward-only cursor over the rows of a completed query.
pub struct RowCursor {
    rows: std::vec::IntoIter<Row>,
}

impl RowCursor {
    fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }

    pub fn has_next(&self) -> bool {
        !self.rows.as_slice().is_empty()
    }

    pub fn next_row(&mut self) -> Option<Row> {
        self.rows.next()
    }

    pub fn remaining(&self) -> usize {
        self.rows.as_slice().len()
    }
}

/// Lifecycle manager for a potentially-unavailable graph store.
///
/// State machine: Unchecked → {Unavailable | Available}; an available
/// store is re-probed for schema readiness on each [`open`], since the
/// store can be wiped and recreated externally between calls.
///
/// [`open`]: StoreManager::open
pub struct StoreManager {
    config: GraphConfig,
    available: AtomicBool,
    schema_ready: AtomicBool,
    // Legacy shared handle, released by the no-argument close().
    shared: Mutex<Option<Graph>>,
}

impl StoreManager {
    /// Attempt the initial handshake. Never fails: an unreachable
    /// store is logged and the manager starts unavailable.
    pub async fn connect(config: GraphConfig) -> Self {
        match Self::build_graph(&config).await {
            Ok(graph) => match graph.run(query("RETURN 1")).await {
                Ok(()) => {
                    tracing::info!(uri = %config.uri, "Connected to garden store");
                    Self {
                        config,
                        available: AtomicBool::new(true),
                        schema_ready: AtomicBool::new(false),
                        shared: Mutex::new(Some(graph)),
                    }
                }
                Err(e) => {
                    tracing::warn!(uri = %config.uri, error = %e, "Garden store unreachable; running memory-only");
                    Self::unavailable(config)
                }
            },
            Err(e) => {
                tracing::warn!(uri = %config.uri, error = %e, "Could not construct store client; running memory-only");
                Self::unavailable(config)
            }
        }
    }

    /// A manager with no store at all, for store-less deployments and tests.
    pub fn offline() -> Self {
        Self::unavailable(GraphConfig::default())
    }

    fn unavailable(config: GraphConfig) -> Self {
        Self {
            config,
            available: AtomicBool::new(false),
            schema_ready: AtomicBool::new(false),
            shared: Mutex::new(None),
        }
    }

    async fn build_graph(config: &GraphConfig) -> Result<Graph, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))
    }

    /// Whether the initial handshake succeeded. Does not promise the
    /// store is still alive.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    /// Schema readiness as last observed by a connection probe.
    pub fn schema_ready(&self) -> bool {
        self.schema_ready.load(Ordering::Relaxed)
    }

    pub(crate) fn set_schema_ready(&self, ready: bool) {
        self.schema_ready.store(ready, Ordering::Relaxed);
    }

    /// Open a fresh connection.
    ///
    /// Re-probes schema readiness as a side effect and bootstraps the
    /// schema best-effort when kinds are missing — that path logs and
    /// never surfaces an error. Returns `None` only when the client
    /// cannot be built at all, which also flips the manager
    /// unavailable.
    pub async fn open(&self) -> Option<StoreConnection> {
        if !self.is_available() {
            return None;
        }

        match Self::build_graph(&self.config).await {
            Ok(graph) => {
                let conn = StoreConnection { graph };
                self.ensure_schema(&conn).await;
                Some(conn)
            }
            Err(e) => {
                tracing::warn!(uri = %self.config.uri, error = %e, "Store connection lost; degrading to memory-only");
                self.available.store(false, Ordering::Relaxed);
                None
            }
        }
    }

    /// Execute an ad hoc parameterized query.
    ///
    /// Runs on the supplied connection when given, else opens and
    /// closes its own. Store unavailable → `Ok(None)`. Query failures
    /// are logged with truncated query text and returned to the
    /// caller — ad hoc callers need to know their query failed.
    pub async fn execute_query(
        &self,
        cypher: &str,
        params: &[(&str, Param)],
        conn: Option<&StoreConnection>,
    ) -> Result<Option<RowCursor>, GraphError> {
        let mut q = query(cypher);
        for (key, value) in params {
            q = match value {
                Param::Str(v) => q.param(key, v.clone()),
                Param::Int(v) => q.param(key, *v),
                Param::Float(v) => q.param(key, *v),
                Param::Bool(v) => q.param(key, *v),
            };
        }

        let result = match conn {
            Some(c) => c.query_rows(q).await,
            None => match self.open().await {
                Some(own) => own.query_rows(q).await,
                None => return Ok(None),
            },
        };

        match result {
            Ok(rows) => Ok(Some(RowCursor::new(rows))),
            Err(e) => {
                tracing::error!(
                    query = truncate(cypher, 120),
                    error = %e,
                    "Store query failed"
                );
                Err(e)
            }
        }
    }

    /// Release a specific connection, or the legacy shared handle when
    /// none is given. Calling this twice is a no-op.
    pub fn close(&self, conn: Option<StoreConnection>) {
        match conn {
            Some(c) => drop(c),
            None => {
                if let Ok(mut shared) = self.shared.lock() {
                    shared.take();
                }
            }
        }
    }
}

/// Truncate for log context without splitting a UTF-8 boundary.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_manager_reports_unavailable() {
        let manager = StoreManager::offline();
        assert!(!manager.is_available());
        assert!(!manager.schema_ready());
        assert!(manager.open().await.is_none());
    }

    #[tokio::test]
    async fn execute_query_on_offline_store_is_none_not_error() {
        let manager = StoreManager::offline();
        let result = manager
            .execute_query("MATCH (n) RETURN n", &[], None)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn double_close_is_noop() {
        let manager = StoreManager::offline();
        manager.close(None);
        manager.close(None);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("MATCH (n) RETURN n", 5), "MATCH");
        assert_eq!(truncate("ok", 120), "ok");
        // Multi-byte characters are not split.
        assert_eq!(truncate("ñññ", 2), "ññ");
    }

    #[test]
    fn param_conversions() {
        assert!(matches!(Param::from("x"), Param::Str(_)));
        assert!(matches!(Param::from(3i64), Param::Int(3)));
        assert!(matches!(Param::from(2.5f64), Param::Float(_)));
        assert!(matches!(Param::from(true), Param::Bool(true)));
    }
}
