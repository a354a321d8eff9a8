//! SQLite-backed [`EdgeSource`] over the persisted job positions.
//!
//! Each row of `job_positions` is one node with its optional parent. The table is created by an
//! embedded migration on first open.

use futures_core::future::BoxFuture;
use sqlx::{
    error::BoxDynError,
    migrate::{Migration as SqlxMigration, MigrationSource, MigrationType, Migrator},
    sqlite::{Sqlite, SqliteConnectOptions, SqlitePoolOptions},
    ConnectOptions, Pool,
};
use std::{path::Path, str::FromStr};

use crate::{
    error::HierarchyError,
    loader::EdgeSource,
    vertex::{NodeEdge, Vertex},
};

/// A migration definition.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

#[derive(Debug, Clone)]
struct MigrationList(Vec<Migration>);

impl MigrationSource<'static> for MigrationList {
    fn resolve(self) -> BoxFuture<'static, Result<Vec<SqlxMigration>, BoxDynError>> {
        Box::pin(async move {
            Ok(self
                .0
                .into_iter()
                .map(|migration| {
                    SqlxMigration::new(
                        migration.version,
                        migration.description.into(),
                        MigrationType::Simple,
                        migration.sql.into(),
                        false,
                    )
                })
                .collect())
        })
    }
}

fn migrations() -> MigrationList {
    MigrationList(vec![Migration {
        version: 1,
        description: "create_job_positions",
        sql: "\
        CREATE TABLE IF NOT EXISTS job_positions (id TEXT PRIMARY KEY, parent_id TEXT); \
        CREATE INDEX IF NOT EXISTS job_positions_parent ON job_positions (parent_id);",
    }])
}

/// Open (creating if needed) the database at `db_path` and bring its schema up to date.
pub async fn db_init<P: AsRef<Path>>(db_path: P) -> Result<Pool<Sqlite>, HierarchyError> {
    let db_path = db_path.as_ref();
    let path = db_path.to_str().ok_or_else(|| {
        HierarchyError::Config(format!("database path {db_path:?} is not valid UTF-8"))
    })?;
    db_connect(&format!("sqlite:{path}")).await
}

/// Connect to a sqlite url (e.g. `sqlite::memory:`) and bring its schema up to date.
pub async fn db_connect(url: &str) -> Result<Pool<Sqlite>, HierarchyError> {
    tracing::debug!("Initializing edge source db: {:?}", url);
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .disable_statement_logging();
    // a private in-memory database only lives as long as its single connection
    let max_connections = if url.contains(":memory:") { 1 } else { 4 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    let migrator = Migrator::new(migrations()).await?;
    migrator.run(&pool).await?;

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM job_positions")
        .fetch_one(&pool)
        .await?;
    tracing::info!("DB Connection initialized. Persisted node count: {}", count);
    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct SqliteEdgeSource(pub Pool<Sqlite>);

impl SqliteEdgeSource {
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, HierarchyError> {
        Ok(SqliteEdgeSource(db_init(db_path).await?))
    }

    pub async fn connect(url: &str) -> Result<Self, HierarchyError> {
        Ok(SqliteEdgeSource(db_connect(url).await?))
    }

    /// Persist `node` under `parent` (or as a root).
    pub async fn insert_node(
        &self,
        node: &Vertex,
        parent: Option<&Vertex>,
    ) -> Result<(), HierarchyError> {
        sqlx::query("INSERT INTO job_positions (id, parent_id) VALUES (?, ?)")
            .bind(node.as_str())
            .bind(parent.map(Vertex::as_str))
            .execute(&self.0)
            .await?;
        Ok(())
    }
}

fn row_to_pair(id: String, parent_id: Option<String>) -> Result<NodeEdge, HierarchyError> {
    let node = Vertex::new(id)?;
    let parent = parent_id.map(Vertex::new).transpose()?;
    Ok(NodeEdge::new(node, parent))
}

impl EdgeSource for SqliteEdgeSource {
    async fn get_edge_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<NodeEdge>, HierarchyError> {
        let limit = i64::try_from(limit)
            .map_err(|_| HierarchyError::Config(format!("page limit {limit} is out of range")))?;
        let offset = i64::try_from(offset)
            .map_err(|_| HierarchyError::Source(format!("page offset {offset} is out of range")))?;
        let rows = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT id, parent_id FROM job_positions ORDER BY rowid LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.0)
        .await?;
        rows.into_iter()
            .map(|(id, parent_id)| row_to_pair(id, parent_id))
            .collect()
    }

    async fn count(&self) -> Result<usize, HierarchyError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM job_positions")
            .fetch_one(&self.0)
            .await?;
        Ok(count as usize)
    }
}
