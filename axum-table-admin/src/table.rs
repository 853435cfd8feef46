//! Table facade
//!
//! [`TableAdmin`] is the long-lived entry point; [`TableAdmin::table`] hands
//! out a [`Table`] bound to the schema as it is at that moment. A `Table` is
//! meant to live for one request and is never cached.

use crate::catalog::Catalog;
use crate::config::AdminConfig;
use crate::database::DatabaseProvider;
use crate::error::Result;
use crate::guard::{MutationGuard, Outcome};
use crate::model::{DynamicModel, ResultPage};
use crate::normalize::Normalizers;
use crate::query::{SearchRequest, Statement};
use crate::record::{Attributes, Record};
use crate::schema::{ColumnInfo, TableInfo, TableSchema};
use crate::value::Value;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared admin state: provider, configuration and normalization hooks
pub struct TableAdmin<DB: DatabaseProvider> {
    catalog: Catalog<DB>,
    config: Arc<AdminConfig>,
    normalizers: Normalizers,
}

impl<DB: DatabaseProvider> TableAdmin<DB> {
    pub fn new(provider: DB, config: AdminConfig) -> Self {
        let config = Arc::new(config);
        Self {
            catalog: Catalog::new(Arc::new(provider), config.clone()),
            config,
            normalizers: Normalizers::new(),
        }
    }

    /// Install per-table normalization hooks
    pub fn with_normalizers(mut self, normalizers: Normalizers) -> Self {
        self.normalizers = normalizers;
        self
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog<DB> {
        &self.catalog
    }

    pub fn provider(&self) -> &Arc<DB> {
        self.catalog.provider()
    }

    /// Accessible tables with row counts
    pub async fn tables(&self) -> Result<Vec<TableInfo>> {
        self.catalog.list_accessible_tables().await
    }

    /// Resolve a table by name
    ///
    /// Fails with `UnknownTable` if the table is missing or denied right now.
    pub async fn table(&self, identifier: &str) -> Result<Table<DB>> {
        let guard = MutationGuard::new(self.config.sandbox, self.config.redact_error_details);
        let model =
            DynamicModel::resolve(&self.catalog, identifier, self.normalizers.clone(), guard).await?;
        Ok(Table {
            model,
            config: self.config.clone(),
        })
    }
}

/// One resolved table
pub struct Table<DB: DatabaseProvider> {
    model: DynamicModel<DB>,
    config: Arc<AdminConfig>,
}

impl<DB: DatabaseProvider> Table<DB> {
    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        self.model.schema()
    }

    pub fn model(&self) -> &DynamicModel<DB> {
        &self.model
    }

    pub fn new_record(&self) -> Record {
        self.model.new_record()
    }

    /// Search with the configured page size rules
    pub async fn data(&self, request: &SearchRequest) -> Result<ResultPage> {
        let per_page = self.config.page_size(request.per_page);
        self.model.search(request, per_page).await
    }

    /// Fetch by primary key
    pub async fn fetch(&self, key: &str) -> Result<Record> {
        self.model.find(key).await
    }

    pub async fn create(&self, attributes: Attributes) -> Outcome<Record> {
        self.model.create(attributes).await
    }

    /// Update the row identified by `key`
    ///
    /// Looking the row up is not a mutation: a missing row is an error for the
    /// request even in sandbox mode.
    pub async fn update(&self, key: &str, attributes: Attributes) -> Result<Outcome<Record>> {
        let record = self.model.find(key).await?;
        Ok(self.model.update(record, attributes).await)
    }

    pub async fn delete(&self, key: &str) -> Outcome<()> {
        self.model.delete(key).await
    }

    pub async fn truncate(&self) -> Outcome<()> {
        self.model.truncate().await
    }

    /// Every row of the table, unfiltered, in key order
    pub fn export(&self) -> RowExport<DB> {
        RowExport {
            provider: self.model.provider().clone(),
            schema: self.schema().clone(),
            statement: self.model.builder().export(self.schema()),
        }
    }
}

/// Lazy, restartable sequence of all rows of one table
///
/// Each call to [`RowExport::rows`] opens a new cursor. The cursor holds a
/// pooled connection only while the returned stream is alive.
pub struct RowExport<DB: DatabaseProvider> {
    provider: Arc<DB>,
    schema: Arc<TableSchema>,
    statement: Statement,
}

impl<DB: DatabaseProvider> RowExport<DB> {
    /// Column descriptors, in the order of every row tuple
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.schema.columns
    }

    pub fn rows(&self) -> BoxStream<'_, Result<Vec<Value>>> {
        self.records()
            .map(|record| record.map(|record| record.row()))
            .boxed()
    }

    pub fn records(&self) -> BoxStream<'_, Result<Record>> {
        self.provider.stream_records(&self.schema, &self.statement)
    }

    /// Detach the export from its owner
    ///
    /// Rows are produced by a background task and handed over through a
    /// channel holding at most `buffer` rows. Dropping the returned stream
    /// stops the task and releases the connection.
    pub fn into_channel_stream(self, buffer: usize) -> BoxStream<'static, Result<Vec<Value>>> {
        let (sender, receiver) = mpsc::channel(buffer.max(1));

        tokio::spawn(async move {
            let mut rows = self.rows();
            while let Some(row) = rows.next().await {
                let failed = row.is_err();
                if sender.send(row).await.is_err() {
                    tracing::debug!("export of {} abandoned by the reader", self.schema.name);
                    break;
                }
                if failed {
                    break;
                }
            }
        });

        stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|row| (row, receiver))
        })
        .boxed()
    }
}
