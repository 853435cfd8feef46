//! Dynamic record model
//!
//! One [`DynamicModel`] serves every table: it pairs a resolved schema with
//! the provider and runs finds, searches and guarded writes against it.

use crate::catalog::Catalog;
use crate::database::DatabaseProvider;
use crate::error::{Error, Result};
use crate::guard::{Mutation, MutationGuard, Outcome};
use crate::normalize::Normalizers;
use crate::query::{QueryBuilder, SearchRequest, Sort};
use crate::record::{Attributes, PrimaryKey, Record};
use crate::schema::TableSchema;
use serde::Serialize;
use std::sync::Arc;

/// One page of search results
#[derive(Debug, Clone, Serialize)]
pub struct ResultPage {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    pub total_count: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,

    /// The page query with parameters rendered as escaped literals
    pub query_text: String,

    /// Sorts applied, defaults included
    pub sorts: Vec<Sort>,

    pub warnings: Vec<String>,
}

/// Runtime accessor for one table
pub struct DynamicModel<DB: DatabaseProvider> {
    provider: Arc<DB>,
    schema: Arc<TableSchema>,
    builder: QueryBuilder,
    normalizers: Normalizers,
    guard: MutationGuard,
}

impl<DB: DatabaseProvider> DynamicModel<DB> {
    pub fn new(
        provider: Arc<DB>,
        schema: Arc<TableSchema>,
        normalizers: Normalizers,
        guard: MutationGuard,
    ) -> Self {
        let builder = QueryBuilder::new(provider.dialect());
        Self {
            provider,
            schema,
            builder,
            normalizers,
            guard,
        }
    }

    /// Bind to the current schema of `table`
    pub async fn resolve(
        catalog: &Catalog<DB>,
        table: &str,
        normalizers: Normalizers,
        guard: MutationGuard,
    ) -> Result<Self> {
        let schema = catalog.describe(table).await?;
        Ok(Self::new(
            catalog.provider().clone(),
            Arc::new(schema),
            normalizers,
            guard,
        ))
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn provider(&self) -> &Arc<DB> {
        &self.provider
    }

    pub fn builder(&self) -> QueryBuilder {
        self.builder
    }

    /// A record with every attribute unset
    pub fn new_record(&self) -> Record {
        Record::new(self.schema.clone())
    }

    /// Build an unsaved record from submitted attributes
    ///
    /// The table's normalization hooks run before coercion.
    pub fn build(&self, mut attributes: Attributes) -> Result<Record> {
        self.normalizers.apply(self.name(), &mut attributes);
        let mut record = self.new_record();
        record.assign(&attributes)?;
        Ok(record)
    }

    /// Fetch one row by its URL-form primary key
    pub async fn find(&self, key: &str) -> Result<Record> {
        let primary_key = PrimaryKey::parse(&self.schema, key)?;
        let statement = self.builder.find(&self.schema, &primary_key);
        self.provider
            .fetch_records(&self.schema, &statement)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(self.name(), key))
    }

    /// Insert a built record
    pub async fn save(&self, record: &Record) -> Outcome<Record> {
        self.guard
            .run(Mutation::Create, self.name(), || self.insert(record))
            .await
    }

    /// Build and insert in one step
    ///
    /// Coercion problems are reported through the outcome like any other
    /// validation failure.
    pub async fn create(&self, attributes: Attributes) -> Outcome<Record> {
        self.guard
            .run(Mutation::Create, self.name(), || async move {
                let record = self.build(attributes)?;
                self.insert(&record).await
            })
            .await
    }

    async fn insert(&self, record: &Record) -> Result<Record> {
        record.validate(true)?;
        let statement = self.builder.insert(&self.schema, record);
        self.provider
            .execute_returning(&self.schema, &statement)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Unknown(format!("insert into {} returned no row", self.name())))
    }

    /// Merge `attributes` into a loaded record and persist the changes
    pub async fn update(&self, mut record: Record, mut attributes: Attributes) -> Outcome<Record> {
        self.guard
            .run(Mutation::Update, self.name(), || async move {
                // The row is addressed by the key it was loaded with
                let key = record.primary_key().ok_or_else(|| {
                    Error::Operation(format!("table {} has no primary key", self.name()))
                })?;

                self.normalizers.apply(self.name(), &mut attributes);
                record.assign(&attributes)?;
                record.validate(false)?;

                let Some(statement) = self.builder.update(&self.schema, &key, &record) else {
                    return Ok(record);
                };
                self.provider
                    .execute_returning(&self.schema, &statement)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::not_found(self.name(), key.to_string()))
            })
            .await
    }

    /// Delete one row by its URL-form primary key
    pub async fn delete(&self, key: &str) -> Outcome<()> {
        self.guard
            .run(Mutation::Delete, self.name(), || async move {
                let primary_key = PrimaryKey::parse(&self.schema, key)?;
                let statement = self.builder.delete(&self.schema, &primary_key);
                match self.provider.execute(&statement).await? {
                    0 => Err(Error::not_found(self.name(), key)),
                    _ => Ok(()),
                }
            })
            .await
    }

    /// Remove every row
    pub async fn truncate(&self) -> Outcome<()> {
        self.guard
            .run(Mutation::Truncate, self.name(), || async move {
                let statement = self.builder.truncate(&self.schema);
                self.provider.execute(&statement).await.map(|_| ())
            })
            .await
    }

    /// Run a search and materialize the requested page
    ///
    /// A page past the end is empty but still reports the total count.
    pub async fn search(&self, request: &SearchRequest, per_page: u64) -> Result<ResultPage> {
        let plan = self.builder.search(&self.schema, request, per_page);

        let total_count = self.provider.fetch_count(&plan.count).await?;
        let offset = (plan.page - 1).saturating_mul(plan.per_page);
        let records = if offset < total_count {
            self.provider.fetch_records(&self.schema, &plan.select).await?
        } else {
            Vec::new()
        };

        Ok(ResultPage {
            columns: self.schema.column_names(),
            records,
            total_count,
            page: plan.page,
            per_page: plan.per_page,
            total_pages: total_pages(total_count, plan.per_page),
            query_text: plan.select.display,
            sorts: plan.sorts,
            warnings: plan.warnings,
        })
    }
}

fn total_pages(total_count: u64, per_page: u64) -> u64 {
    total_count.div_ceil(per_page.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(30, 10), 3);
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 500), 1);
    }
}
