//! Schema catalog
//!
//! Table enumeration and description filtered through the configured
//! denylist. Nothing is cached; the database is asked every time.

use crate::config::AdminConfig;
use crate::database::DatabaseProvider;
use crate::error::{Error, Result};
use crate::schema::{TableInfo, TableSchema};
use std::sync::Arc;

/// Tables visible to the admin, as allowed by configuration
pub struct Catalog<DB: DatabaseProvider> {
    provider: Arc<DB>,
    config: Arc<AdminConfig>,
}

impl<DB: DatabaseProvider> Clone for Catalog<DB> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            config: self.config.clone(),
        }
    }
}

impl<DB: DatabaseProvider> Catalog<DB> {
    pub fn new(provider: Arc<DB>, config: Arc<AdminConfig>) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &Arc<DB> {
        &self.provider
    }

    /// User tables in name order, denied tables removed
    pub async fn list_accessible_tables(&self) -> Result<Vec<TableInfo>> {
        let tables = self.provider.list_tables().await.map_err(|error| match error {
            Error::Connection(_) => error,
            other => Error::Connection(format!("could not read the table catalog: {other}")),
        })?;

        let mut accessible: Vec<TableInfo> = tables
            .into_iter()
            .filter(|table| !self.config.is_denied(&table.name))
            .collect();
        accessible.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(accessible)
    }

    /// Describe a table as it exists right now
    ///
    /// Denied tables are reported exactly like missing ones.
    pub async fn describe(&self, table: &str) -> Result<TableSchema> {
        if table.is_empty() || self.config.is_denied(table) {
            return Err(Error::UnknownTable(table.to_string()));
        }
        self.provider.get_table_schema(table).await
    }
}
