//! PostgreSQL database provider implementation

use crate::database::traits::{with_timeout, DatabaseProvider, DEFAULT_STATEMENT_TIMEOUT};
use crate::error::{Error, Result};
use crate::query::{Dialect, Statement};
use crate::record::Record;
use crate::schema::{ColumnInfo, ForeignKey, IndexInfo, SemanticType, TableInfo, TableSchema};
use crate::value::Value;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use sqlx::postgres::{PgArguments, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{PgPool, Row, ValueRef};
use std::sync::Arc;
use std::time::Duration;

/// PostgreSQL database provider
///
/// Tables are looked up in the connection's current schema (normally `public`).
pub struct PostgresProvider {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresProvider {
    /// Create a new PostgreSQL provider
    ///
    /// # Arguments
    ///
    /// * `pool` - PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }

    /// Override the per-statement timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Row count for the table listing
    ///
    /// Counts are informational: a failure or timeout yields `None` and does
    /// not hide the table.
    async fn row_count(&self, table: &str) -> Option<u64> {
        let count_query = format!("SELECT COUNT(*) as count FROM {}", Self::quote_identifier(table));
        let count: Result<i64> = with_timeout(
            self.timeout,
            sqlx::query_scalar(&count_query).fetch_one(&self.pool),
        )
        .await;

        match count {
            Ok(count) => Some(count.max(0) as u64),
            Err(error) => {
                tracing::debug!("could not count rows of '{}': {}", table, error);
                None
            }
        }
    }

    fn quote_identifier(identifier: &str) -> String {
        Dialect::Postgres.quote_identifier(identifier)
    }

    /// Build the column descriptor for an `information_schema.columns` row
    ///
    /// Enums and other user-defined types report `USER-DEFINED`, arrays report
    /// `ARRAY`; the underlying type name lives in `udt_name`.
    fn column_info(name: String, data_type: &str, udt_name: &str) -> ColumnInfo {
        match data_type {
            "USER-DEFINED" => ColumnInfo::new(name, udt_name),
            "ARRAY" => {
                let mut column = ColumnInfo::new(name, udt_name);
                column.semantic_type = SemanticType::Unknown;
                column
            }
            _ => ColumnInfo::new(name, data_type),
        }
    }

    fn is_auto_generated(default_value: Option<&str>, is_identity: &str) -> bool {
        is_identity.eq_ignore_ascii_case("YES")
            || default_value.is_some_and(|default| default.starts_with("nextval("))
    }

    /// Bind statement parameters in order
    fn bind_values<'q>(
        mut query: Query<'q, Postgres, PgArguments>,
        values: &[Value],
    ) -> Query<'q, Postgres, PgArguments> {
        for value in values {
            query = match value {
                Value::Null => query.bind(None::<String>),
                Value::Text(text) => query.bind(text.clone()),
                Value::Integer(number) => query.bind(*number),
                Value::Real(number) => query.bind(*number),
                Value::Boolean(flag) => query.bind(*flag),
                Value::Date(date) => query.bind(*date),
                Value::Timestamp(timestamp) => query.bind(*timestamp),
                Value::Binary(bytes) => query.bind(bytes.clone()),
            };
        }
        query
    }

    /// Convert a PostgreSQL row to a record of `schema`
    fn row_to_record(schema: &Arc<TableSchema>, row: &PgRow) -> Result<Record> {
        let values = schema
            .columns
            .iter()
            .map(|column| Self::extract_column_value(row, column))
            .collect::<Result<Vec<_>>>()?;
        Ok(Record::loaded(schema.clone(), values))
    }

    /// Extract a column value from a PostgreSQL row
    ///
    /// Types without a native decoder are selected as text (see
    /// [`Dialect`]), so every branch ends in a string fallback.
    fn extract_column_value(row: &PgRow, column: &ColumnInfo) -> Result<Value> {
        let name = column.name.as_str();

        if row.try_get_raw(name)?.is_null() {
            return Ok(Value::Null);
        }

        let text = || row.try_get::<String, _>(name).ok();

        let typed = match column.semantic_type {
            SemanticType::Number if column.is_integral() => row
                .try_get::<i64, _>(name)
                .or_else(|_| row.try_get::<i32, _>(name).map(i64::from))
                .or_else(|_| row.try_get::<i16, _>(name).map(i64::from))
                .ok()
                .map(Value::Integer),
            SemanticType::Number => row
                .try_get::<f64, _>(name)
                .or_else(|_| row.try_get::<f32, _>(name).map(f64::from))
                .ok()
                .or_else(|| text().and_then(|text| text.parse::<f64>().ok()))
                .map(Value::Real),
            SemanticType::Boolean => row.try_get::<bool, _>(name).ok().map(Value::Boolean),
            SemanticType::Date => row
                .try_get::<NaiveDateTime, _>(name)
                .ok()
                .or_else(|| {
                    row.try_get::<DateTime<Utc>, _>(name)
                        .ok()
                        .map(|timestamp| timestamp.naive_utc())
                })
                .map(Value::Timestamp)
                .or_else(|| row.try_get::<NaiveDate, _>(name).ok().map(Value::Date)),
            SemanticType::Binary => row.try_get::<Vec<u8>, _>(name).ok().map(Value::Binary),
            SemanticType::Text | SemanticType::Unknown => text().map(Value::Text),
        };
        if let Some(value) = typed {
            return Ok(value);
        }

        // Fallback: try as string
        if let Some(value) = text() {
            return Ok(Value::Text(value));
        }

        tracing::warn!(
            "could not decode column '{}' ({}); reading it as NULL",
            column.name,
            column.data_type
        );
        Ok(Value::Null)
    }
}

#[async_trait]
impl DatabaseProvider for PostgresProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let query = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = with_timeout(self.timeout, sqlx::query(query).fetch_all(&self.pool)).await?;

        let mut tables = Vec::new();
        for row in rows {
            let name: String = row.try_get("table_name")?;

            let row_count = self.row_count(&name).await;

            tables.push(TableInfo { name, row_count });
        }

        Ok(tables)
    }

    async fn get_table_schema(&self, table: &str) -> Result<TableSchema> {
        // Get column information
        let column_query = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                udt_name::text AS udt_name,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default,
                is_identity::text AS is_identity
            FROM information_schema.columns
            WHERE table_schema = current_schema()
              AND table_name = $1
            ORDER BY ordinal_position
        "#;

        let column_rows = with_timeout(
            self.timeout,
            sqlx::query(column_query).bind(table).fetch_all(&self.pool),
        )
        .await?;

        if column_rows.is_empty() {
            return Err(Error::UnknownTable(table.to_string()));
        }

        // Get primary key columns
        let pk_query = r#"
            SELECT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
              AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = current_schema()
              AND tc.table_name = $1
              AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position
        "#;

        let pk_rows = with_timeout(
            self.timeout,
            sqlx::query(pk_query).bind(table).fetch_all(&self.pool),
        )
        .await?;

        let primary_key: Vec<String> = pk_rows
            .iter()
            .map(|row| row.try_get::<String, _>("column_name"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Get foreign keys
        let fk_query = r#"
            SELECT
                kcu.column_name::text AS column_name,
                ccu.table_name::text AS references_table,
                ccu.column_name::text AS references_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
              AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
              ON ccu.constraint_name = tc.constraint_name
              AND ccu.table_schema = tc.table_schema
            WHERE tc.table_schema = current_schema()
              AND tc.table_name = $1
              AND tc.constraint_type = 'FOREIGN KEY'
        "#;

        let fk_rows = with_timeout(
            self.timeout,
            sqlx::query(fk_query).bind(table).fetch_all(&self.pool),
        )
        .await?;

        let foreign_keys: Vec<ForeignKey> = fk_rows
            .iter()
            .map(|row| {
                Ok(ForeignKey {
                    column: row.try_get("column_name")?,
                    references_table: row.try_get("references_table")?,
                    references_column: row.try_get("references_column")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

        // Get indexes with their columns in key order, primary key index excluded
        let index_query = r#"
            SELECT
                i.relname::text AS index_name,
                ix.indisunique AS is_unique,
                ARRAY(
                    SELECT a.attname::text
                    FROM unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
                    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
                    ORDER BY k.ord
                ) AS columns
            FROM pg_class t
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_index ix ON ix.indrelid = t.oid
            JOIN pg_class i ON i.oid = ix.indexrelid
            WHERE n.nspname = current_schema()
              AND t.relname = $1
              AND NOT ix.indisprimary
            ORDER BY i.relname
        "#;

        let index_rows = with_timeout(
            self.timeout,
            sqlx::query(index_query).bind(table).fetch_all(&self.pool),
        )
        .await?;

        let indexes: Vec<IndexInfo> = index_rows
            .iter()
            .map(|row| {
                Ok(IndexInfo {
                    name: row.try_get("index_name")?,
                    columns: row.try_get("columns")?,
                    unique: row.try_get("is_unique")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

        // Build column info
        let columns: Vec<ColumnInfo> = column_rows
            .iter()
            .map(|row| {
                let column_name: String = row.try_get("column_name")?;
                let data_type: String = row.try_get("data_type")?;
                let udt_name: String = row.try_get("udt_name")?;
                let is_nullable: String = row.try_get("is_nullable")?;
                let column_default: Option<String> = row.try_get("column_default")?;
                let is_identity: Option<String> = row.try_get("is_identity")?;

                let is_primary_key = primary_key.contains(&column_name);
                let mut column = Self::column_info(column_name, &data_type, &udt_name);
                column.nullable = is_nullable == "YES";
                column.auto_generated = Self::is_auto_generated(
                    column_default.as_deref(),
                    is_identity.as_deref().unwrap_or("NO"),
                );
                column.default_value = column_default;
                column.is_primary_key = is_primary_key;
                Ok(column)
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

        Ok(TableSchema {
            name: table.to_string(),
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }

    async fn fetch_records(&self, schema: &Arc<TableSchema>, statement: &Statement) -> Result<Vec<Record>> {
        tracing::debug!("{}", statement.display);
        let query = Self::bind_values(sqlx::query(&statement.sql), &statement.params);
        let rows = with_timeout(self.timeout, query.fetch_all(&self.pool)).await?;

        rows.iter()
            .map(|row| Self::row_to_record(schema, row))
            .collect()
    }

    async fn fetch_count(&self, statement: &Statement) -> Result<u64> {
        tracing::debug!("{}", statement.display);
        let query = Self::bind_values(sqlx::query(&statement.sql), &statement.params);
        let row = with_timeout(self.timeout, query.fetch_one(&self.pool)).await?;
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as u64)
    }

    async fn execute_returning(&self, schema: &Arc<TableSchema>, statement: &Statement) -> Result<Vec<Record>> {
        tracing::debug!("{}", statement.display);
        let rows = with_timeout(self.timeout, async {
            let mut transaction = self.pool.begin().await?;
            let rows = Self::bind_values(sqlx::query(&statement.sql), &statement.params)
                .fetch_all(&mut *transaction)
                .await?;
            transaction.commit().await?;
            Ok::<_, sqlx::Error>(rows)
        })
        .await?;

        rows.iter()
            .map(|row| Self::row_to_record(schema, row))
            .collect()
    }

    async fn execute(&self, statement: &Statement) -> Result<u64> {
        tracing::debug!("{}", statement.display);
        with_timeout(self.timeout, async {
            let mut transaction = self.pool.begin().await?;
            let result = Self::bind_values(sqlx::query(&statement.sql), &statement.params)
                .execute(&mut *transaction)
                .await?;
            transaction.commit().await?;
            Ok::<_, sqlx::Error>(result.rows_affected())
        })
        .await
    }

    fn stream_records<'a>(
        &'a self,
        schema: &'a Arc<TableSchema>,
        statement: &'a Statement,
    ) -> BoxStream<'a, Result<Record>> {
        tracing::debug!("{}", statement.display);
        Self::bind_values(sqlx::query(&statement.sql), &statement.params)
            .fetch(&self.pool)
            .map(move |row| Self::row_to_record(schema, &row?))
            .boxed()
    }
}
