//! PostgreSQL edge store for production use.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)
//!
//! ## Consistency
//!
//! Mutations run in `SERIALIZABLE` transactions. The table additionally
//! carries a primary key on `(from_id, to_id)` and a unique constraint on
//! `to_id`; violations of either are reported as [`StoreConflict`]s.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Executor, Postgres, Row, Transaction};
use std::time::Duration;

use crate::types::{Edge, NodeId};
use super::{EdgeReader, EdgeStore, EdgeWriter, StoreConflict, StoreError};

/// DDL for the edge table.
pub const EDGE_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS edge (
    from_id BIGINT NOT NULL CHECK (from_id > 0),
    to_id   BIGINT NOT NULL CHECK (to_id > 0),
    CONSTRAINT edge_pkey PRIMARY KEY (from_id, to_id),
    CONSTRAINT edge_to_id_key UNIQUE (to_id),
    CONSTRAINT edge_no_self_loop CHECK (from_id <> to_id)
)
"#;

const PRIMARY_KEY_CONSTRAINT: &str = "edge_pkey";
const SINGLE_PARENT_CONSTRAINT: &str = "edge_to_id_key";
const UNIQUE_VIOLATION: &str = "23505";

/// Configuration for PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/edge_forest".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A stored row violates the id invariants.
    #[error("Corrupt edge row: {0}")]
    CorruptRow(String),
}

impl StoreError for PostgresError {
    fn conflict(&self) -> Option<StoreConflict> {
        let Self::Database(sqlx::Error::Database(db)) = self else {
            return None;
        };
        classify_conflict(db.code().as_deref(), db.constraint())
    }
}

/// Map a SQLSTATE and constraint name to the uniqueness rule it enforces.
fn classify_conflict(code: Option<&str>, constraint: Option<&str>) -> Option<StoreConflict> {
    if code != Some(UNIQUE_VIOLATION) {
        return None;
    }
    match constraint {
        Some(PRIMARY_KEY_CONSTRAINT) => Some(StoreConflict::DuplicateEdge),
        Some(SINGLE_PARENT_CONSTRAINT) => Some(StoreConflict::ParentTaken),
        _ => None,
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    /// Current pool size.
    pub size: u32,
    /// Number of idle connections.
    pub idle: usize,
    /// Maximum pool size.
    pub max: u32,
}

/// PostgreSQL edge store.
///
/// Uses connection pooling with production-tuned settings.
#[derive(Debug, Clone)]
pub struct PostgresEdgeStore {
    pool: PgPool,
}

impl PostgresEdgeStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the edge table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), PostgresError> {
        sqlx::query(EDGE_TABLE_SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Get pool statistics for monitoring.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }
}

fn node_column(row: &PgRow, column: &str) -> Result<NodeId, PostgresError> {
    let raw: i64 = row.try_get(column)?;
    NodeId::new(raw).map_err(|e| PostgresError::CorruptRow(e.to_string()))
}

fn parse_edge_row(row: &PgRow) -> Result<Edge, PostgresError> {
    Ok(Edge {
        from: node_column(row, "from_id")?,
        to: node_column(row, "to_id")?,
    })
}

fn raw_ids(nodes: &[NodeId]) -> Vec<i64> {
    nodes.iter().map(NodeId::get).collect()
}

async fn exists_query<'e, E>(exec: E, edge: &Edge) -> Result<bool, PostgresError>
where
    E: Executor<'e, Database = Postgres>,
{
    let found: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM edge WHERE from_id = $1 AND to_id = $2)",
    )
    .bind(edge.from.get())
    .bind(edge.to.get())
    .fetch_one(exec)
    .await?;
    Ok(found)
}

async fn has_incoming_query<'e, E>(exec: E, to: NodeId) -> Result<bool, PostgresError>
where
    E: Executor<'e, Database = Postgres>,
{
    let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM edge WHERE to_id = $1)")
        .bind(to.get())
        .fetch_one(exec)
        .await?;
    Ok(found)
}

async fn children_query<'e, E>(exec: E, frontier: &[NodeId]) -> Result<Vec<Edge>, PostgresError>
where
    E: Executor<'e, Database = Postgres>,
{
    if frontier.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(
        r#"
        SELECT from_id, to_id
        FROM edge
        WHERE from_id = ANY($1)
        ORDER BY from_id, to_id
        "#,
    )
    .bind(raw_ids(frontier))
    .fetch_all(exec)
    .await?;

    rows.iter().map(parse_edge_row).collect()
}

async fn participates_query<'e, E>(exec: E, node: NodeId) -> Result<bool, PostgresError>
where
    E: Executor<'e, Database = Postgres>,
{
    let found: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM edge WHERE from_id = $1 OR to_id = $1)",
    )
    .bind(node.get())
    .fetch_one(exec)
    .await?;
    Ok(found)
}

/// Read-only view running each query on a pooled connection.
///
/// Queries are not wrapped in a transaction; a tree read may observe
/// commits that land between expansion rounds.
#[derive(Debug, Clone)]
pub struct PostgresReader {
    pool: PgPool,
}

#[async_trait]
impl EdgeReader for PostgresReader {
    type Error = PostgresError;

    async fn exists(&mut self, edge: &Edge) -> Result<bool, Self::Error> {
        exists_query(&self.pool, edge).await
    }

    async fn has_incoming(&mut self, to: NodeId) -> Result<bool, Self::Error> {
        has_incoming_query(&self.pool, to).await
    }

    async fn children_of(&mut self, frontier: &[NodeId]) -> Result<Vec<Edge>, Self::Error> {
        children_query(&self.pool, frontier).await
    }

    async fn participates(&mut self, node: NodeId) -> Result<bool, Self::Error> {
        participates_query(&self.pool, node).await
    }
}

/// Serializable read-write unit. Rolls back on drop unless committed.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl EdgeReader for PostgresTransaction {
    type Error = PostgresError;

    async fn exists(&mut self, edge: &Edge) -> Result<bool, Self::Error> {
        exists_query(&mut *self.tx, edge).await
    }

    async fn has_incoming(&mut self, to: NodeId) -> Result<bool, Self::Error> {
        has_incoming_query(&mut *self.tx, to).await
    }

    async fn children_of(&mut self, frontier: &[NodeId]) -> Result<Vec<Edge>, Self::Error> {
        children_query(&mut *self.tx, frontier).await
    }

    async fn participates(&mut self, node: NodeId) -> Result<bool, Self::Error> {
        participates_query(&mut *self.tx, node).await
    }
}

#[async_trait]
impl EdgeWriter for PostgresTransaction {
    async fn insert(&mut self, edge: &Edge) -> Result<(), Self::Error> {
        sqlx::query("INSERT INTO edge (from_id, to_id) VALUES ($1, $2)")
            .bind(edge.from.get())
            .bind(edge.to.get())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete(&mut self, edge: &Edge) -> Result<bool, Self::Error> {
        let result = sqlx::query("DELETE FROM edge WHERE from_id = $1 AND to_id = $2")
            .bind(edge.from.get())
            .bind(edge.to.get())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self) -> Result<(), Self::Error> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl EdgeStore for PostgresEdgeStore {
    type Error = PostgresError;
    type Reader = PostgresReader;
    type Transaction = PostgresTransaction;

    async fn reader(&self) -> Result<Self::Reader, Self::Error> {
        Ok(PostgresReader {
            pool: self.pool.clone(),
        })
    }

    async fn begin(&self) -> Result<Self::Transaction, Self::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(PostgresTransaction { tx })
    }

    async fn ping(&self) -> Result<(), Self::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
