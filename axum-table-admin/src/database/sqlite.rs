//! SQLite database provider implementation

use crate::database::traits::{with_timeout, DatabaseProvider, DEFAULT_STATEMENT_TIMEOUT};
use crate::error::{Error, Result};
use crate::query::{Dialect, Statement};
use crate::record::Record;
use crate::schema::{ColumnInfo, ForeignKey, IndexInfo, SemanticType, TableInfo, TableSchema};
use crate::value::Value;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use futures::stream::{BoxStream, StreamExt};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Row, SqlitePool, ValueRef};
use std::sync::Arc;
use std::time::Duration;

/// SQLite database provider
pub struct SqliteProvider {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteProvider {
    /// Create a new SQLite provider
    ///
    /// # Arguments
    ///
    /// * `pool` - SQLite connection pool
    pub fn new(pool: SqlitePool) -> Self {
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

    pub fn pool(&self) -> &SqlitePool {
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
        Dialect::Sqlite.quote_identifier(identifier)
    }

    /// Bind statement parameters in order
    fn bind_values<'q>(
        mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
        values: &[Value],
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
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

    /// Convert a SQLite row to a record of `schema`
    fn row_to_record(schema: &Arc<TableSchema>, row: &SqliteRow) -> Result<Record> {
        let values = schema
            .columns
            .iter()
            .map(|column| Self::extract_column_value(row, column))
            .collect::<Result<Vec<_>>>()?;
        Ok(Record::loaded(schema.clone(), values))
    }

    /// Extract a column value from a SQLite row
    ///
    /// The declared type decides the first decoding attempt. SQLite has dynamic
    /// typing, so a cell may hold something else entirely; fall back through
    /// the storage classes before giving up.
    fn extract_column_value(row: &SqliteRow, column: &ColumnInfo) -> Result<Value> {
        let name = column.name.as_str();

        // Check if the value is NULL first
        if row.try_get_raw(name)?.is_null() {
            return Ok(Value::Null);
        }

        let timestamp = || row.try_get::<NaiveDateTime, _>(name).ok().map(Value::Timestamp);
        let date = || row.try_get::<NaiveDate, _>(name).ok().map(Value::Date);

        let typed = match column.semantic_type {
            SemanticType::Number if column.is_integral() => {
                row.try_get::<i64, _>(name).ok().map(Value::Integer)
            }
            SemanticType::Number => row.try_get::<f64, _>(name).ok().map(Value::Real),
            SemanticType::Boolean => row.try_get::<bool, _>(name).ok().map(Value::Boolean),
            SemanticType::Date if column.has_time() => timestamp().or_else(date),
            SemanticType::Date => date().or_else(timestamp),
            SemanticType::Binary => row.try_get::<Vec<u8>, _>(name).ok().map(Value::Binary),
            SemanticType::Text | SemanticType::Unknown => {
                row.try_get::<String, _>(name).ok().map(Value::Text)
            }
        };
        if let Some(value) = typed {
            return Ok(value);
        }

        // Fallback: try the storage classes in order
        if let Ok(value) = row.try_get::<i64, _>(name) {
            return Ok(Value::Integer(value));
        }
        if let Ok(value) = row.try_get::<f64, _>(name) {
            return Ok(Value::Real(value));
        }
        if let Ok(value) = row.try_get::<String, _>(name) {
            return Ok(Value::Text(value));
        }
        if let Ok(value) = row.try_get::<Vec<u8>, _>(name) {
            return Ok(Value::Binary(value));
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
impl DatabaseProvider for SqliteProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let query = "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

        let rows = with_timeout(self.timeout, sqlx::query(query).fetch_all(&self.pool)).await?;

        let mut tables = Vec::new();
        for row in rows {
            let name: String = row.try_get("name")?;

            let row_count = self.row_count(&name).await;

            tables.push(TableInfo { name, row_count });
        }

        Ok(tables)
    }

    async fn get_table_schema(&self, table: &str) -> Result<TableSchema> {
        // Get column information using PRAGMA table_info
        let table_info_query = format!("PRAGMA table_info({})", Self::quote_identifier(table));
        let column_rows =
            with_timeout(self.timeout, sqlx::query(&table_info_query).fetch_all(&self.pool)).await?;

        if column_rows.is_empty() {
            return Err(Error::UnknownTable(table.to_string()));
        }

        let mut columns = Vec::new();
        let mut primary_key_columns = Vec::new();

        for row in column_rows {
            // PRAGMA table_info returns: cid, name, type, notnull, dflt_value, pk
            let name: String = row.try_get("name")?;
            let data_type: String = row.try_get("type")?;
            let not_null: i64 = row.try_get("notnull")?;
            let default_value: Option<String> = row.try_get::<Option<String>, _>("dflt_value").ok().flatten();
            let primary_key: i64 = row.try_get("pk")?;

            let is_primary_key = primary_key > 0;
            if is_primary_key {
                primary_key_columns.push((primary_key, name.clone()));
            }

            let mut column = ColumnInfo::new(name, data_type);
            column.nullable = not_null == 0 && !is_primary_key;
            column.default_value = default_value;
            column.is_primary_key = is_primary_key;
            columns.push(column);
        }

        // Sort primary key columns by their pk order and extract names
        primary_key_columns.sort_by_key(|(order, _)| *order);
        let primary_key: Vec<String> = primary_key_columns.into_iter().map(|(_, name)| name).collect();

        // A lone INTEGER PRIMARY KEY aliases the rowid and is assigned on insert
        if let [key] = primary_key.as_slice() {
            if let Some(column) = columns.iter_mut().find(|column| &column.name == key) {
                column.auto_generated = column.data_type.eq_ignore_ascii_case("INTEGER");
            }
        }

        // Get foreign key information using PRAGMA foreign_key_list
        let foreign_key_query = format!("PRAGMA foreign_key_list({})", Self::quote_identifier(table));
        let foreign_key_rows =
            with_timeout(self.timeout, sqlx::query(&foreign_key_query).fetch_all(&self.pool)).await?;

        let mut foreign_keys = Vec::new();
        for row in foreign_key_rows {
            // PRAGMA foreign_key_list returns: id, seq, table, from, to, on_update, on_delete, match
            let column: String = row.try_get("from")?;
            let references_table: String = row.try_get("table")?;
            let references_column: String = row
                .try_get::<Option<String>, _>("to")?
                .unwrap_or_default();

            foreign_keys.push(ForeignKey {
                column,
                references_table,
                references_column,
            });
        }

        // Get index information using PRAGMA index_list
        let index_list_query = format!("PRAGMA index_list({})", Self::quote_identifier(table));
        let index_rows =
            with_timeout(self.timeout, sqlx::query(&index_list_query).fetch_all(&self.pool)).await?;

        let mut indexes = Vec::new();
        for row in index_rows {
            // PRAGMA index_list returns: seq, name, unique, origin, partial
            let index_name: String = row.try_get("name")?;
            let unique: i64 = row.try_get("unique")?;

            // Get columns in this index using PRAGMA index_info
            let index_info_query = format!("PRAGMA index_info({})", Self::quote_identifier(&index_name));
            let index_column_rows =
                with_timeout(self.timeout, sqlx::query(&index_info_query).fetch_all(&self.pool)).await?;

            let index_columns = index_column_rows
                .iter()
                .filter_map(|column_row| column_row.try_get::<Option<String>, _>("name").ok().flatten())
                .collect();

            indexes.push(IndexInfo {
                name: index_name,
                columns: index_columns,
                unique: unique != 0,
            });
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(SqliteProvider::quote_identifier("users"), "\"users\"");
        assert_eq!(
            SqliteProvider::quote_identifier("table\"name"),
            "\"table\"\"name\""
        );
    }

    #[tokio::test]
    async fn test_get_table_schema() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL UNIQUE)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id), status TEXT DEFAULT 'pending')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let provider = SqliteProvider::new(pool);
        let schema = provider.get_table_schema("orders").await.unwrap();

        assert_eq!(schema.primary_key, vec!["id".to_string()]);
        assert!(schema.columns[0].auto_generated);
        assert!(!schema.columns[0].nullable);
        assert_eq!(schema.columns[2].default_value.as_deref(), Some("'pending'"));
        assert_eq!(schema.foreign_keys[0].references_table, "users");

        let users = provider.get_table_schema("users").await.unwrap();
        assert!(users.column("email").unwrap().is_required());
        assert!(users.indexes.iter().any(|index| index.unique));
    }

    #[tokio::test]
    async fn test_composite_key_is_not_auto_generated() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE lines (order_id INTEGER, line INTEGER, sku TEXT, PRIMARY KEY (order_id, line))")
            .execute(&pool)
            .await
            .unwrap();

        let schema = SqliteProvider::new(pool).get_table_schema("lines").await.unwrap();
        assert_eq!(schema.primary_key, vec!["order_id".to_string(), "line".to_string()]);
        assert!(schema.columns.iter().all(|column| !column.auto_generated));
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let provider = SqliteProvider::new(memory_pool().await);
        assert!(matches!(
            provider.get_table_schema("missing").await,
            Err(Error::UnknownTable(_))
        ));
    }

    #[tokio::test]
    async fn test_row_count_gives_up_after_the_statement_timeout() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE widgets (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        let provider = SqliteProvider::new(pool.clone()).with_timeout(Duration::from_millis(50));
        assert_eq!(provider.row_count("widgets").await, Some(0));

        // the only pooled connection is busy, so the count cannot start
        let held = pool.acquire().await.unwrap();
        let count = tokio::time::timeout(Duration::from_secs(5), provider.row_count("widgets"))
            .await
            .unwrap();
        assert_eq!(count, None);
        drop(held);
    }

    #[tokio::test]
    async fn test_list_tables_skips_internal_tables() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE widgets (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO widgets (name) VALUES ('a'), ('b')")
            .execute(&pool)
            .await
            .unwrap();

        let tables = SqliteProvider::new(pool).list_tables().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "widgets");
        assert_eq!(tables[0].row_count, Some(2));
    }

    #[tokio::test]
    async fn test_dynamic_typing_falls_back() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE loose (id INTEGER PRIMARY KEY, amount INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO loose (amount) VALUES ('not a number')")
            .execute(&pool)
            .await
            .unwrap();

        let provider = SqliteProvider::new(pool);
        let schema = Arc::new(provider.get_table_schema("loose").await.unwrap());
        let statement = crate::query::QueryBuilder::new(Dialect::Sqlite).export(&schema);
        let records = provider.fetch_records(&schema, &statement).await.unwrap();

        assert_eq!(
            records[0].get("amount"),
            Some(&Value::Text("not a number".to_string()))
        );
    }
}
