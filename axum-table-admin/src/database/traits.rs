//! Database provider trait
//!
//! This trait defines the interface that all database implementations must provide.
//! Providers know how to introspect their catalog and how to execute the
//! statements produced by [`QueryBuilder`](crate::query::QueryBuilder); they do
//! not build SQL for searches or mutations themselves.

use crate::error::{Error, Result};
use crate::query::{Dialect, Statement};
use crate::record::Record;
use crate::schema::{TableInfo, TableSchema};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for a single database round trip
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Database provider trait for schema discovery and data access
///
/// Implementations of this trait provide database-specific logic for
/// discovering schema information, decoding rows into [`Record`]s and running
/// statements.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// SQL flavour used to build statements for this provider
    fn dialect(&self) -> Dialect;

    /// List all user table names in the database
    ///
    /// # Returns
    ///
    /// A vector of table information, optionally including row counts
    async fn list_tables(&self) -> Result<Vec<TableInfo>>;

    /// Get schema information for a specific table
    ///
    /// # Arguments
    ///
    /// * `table` - Name of the table
    ///
    /// # Returns
    ///
    /// Complete schema information including columns, keys, and indexes, or
    /// `Error::UnknownTable` when the table does not exist right now
    async fn get_table_schema(&self, table: &str) -> Result<TableSchema>;

    /// Run a read-only statement and decode every row against `schema`
    async fn fetch_records(&self, schema: &Arc<TableSchema>, statement: &Statement) -> Result<Vec<Record>>;

    /// Run a `SELECT COUNT(*)` statement
    async fn fetch_count(&self, statement: &Statement) -> Result<u64>;

    /// Run a write that returns rows (`INSERT`/`UPDATE ... RETURNING`)
    ///
    /// Executes inside its own transaction; nothing is committed on failure.
    async fn execute_returning(&self, schema: &Arc<TableSchema>, statement: &Statement) -> Result<Vec<Record>>;

    /// Run a write and report the number of affected rows
    ///
    /// Executes inside its own transaction; nothing is committed on failure.
    async fn execute(&self, statement: &Statement) -> Result<u64>;

    /// Stream the rows of a read-only statement
    ///
    /// The connection is held only while the stream is alive and goes back
    /// to the pool as soon as the stream completes or is dropped.
    fn stream_records<'a>(
        &'a self,
        schema: &'a Arc<TableSchema>,
        statement: &'a Statement,
    ) -> BoxStream<'a, Result<Record>>;
}

/// Await a driver future, giving up after `timeout`
pub(crate) async fn with_timeout<F, T>(timeout: Duration, future: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result.map_err(Error::from),
        Err(_) => Err(Error::Connection(format!(
            "Query timeout exceeded ({} s)",
            timeout.as_secs_f64()
        ))),
    }
}
