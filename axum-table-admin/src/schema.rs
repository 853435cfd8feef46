//! Schema types for dynamic database introspection
//!
//! These types represent database schema information discovered at runtime.

use serde::{Deserialize, Serialize};

/// Complete schema information for a database table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Name of the table
    pub name: String,

    /// List of columns in the table, in declaration order
    pub columns: Vec<ColumnInfo>,

    /// Primary key column names in key order (empty when the table has none)
    pub primary_key: Vec<String>,

    /// Foreign key constraints
    pub foreign_keys: Vec<ForeignKey>,

    /// Index definitions
    pub indexes: Vec<IndexInfo>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    /// Primary key columns in key order
    pub fn primary_key_columns(&self) -> Vec<&ColumnInfo> {
        self.primary_key
            .iter()
            .filter_map(|name| self.column(name))
            .collect()
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }
}

/// Information about a single column
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// SQL data type as declared (e.g., "INTEGER", "TEXT", "VARCHAR(255)")
    pub data_type: String,

    /// Type family used for coercion and decoding
    pub semantic_type: SemanticType,

    /// Whether the column allows NULL values
    pub nullable: bool,

    /// Default value expression (if any)
    pub default_value: Option<String>,

    /// Whether this column is part of the primary key
    pub is_primary_key: bool,

    /// Whether the database fills the value in on insert (rowid alias, serial, identity)
    pub auto_generated: bool,
}

impl ColumnInfo {
    /// Build a column descriptor, deriving the semantic type from the declared type
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        Self {
            name: name.into(),
            semantic_type: SemanticType::from_declared(&data_type),
            data_type,
            nullable: true,
            default_value: None,
            is_primary_key: false,
            auto_generated: false,
        }
    }

    /// Whether numbers in this column are whole numbers
    pub fn is_integral(&self) -> bool {
        let declared = self.data_type.to_ascii_uppercase();
        declared.contains("INT") || declared.contains("SERIAL")
    }

    /// Whether the column holds a time of day in addition to a date
    pub fn has_time(&self) -> bool {
        self.data_type.to_ascii_uppercase().contains("TIME")
    }

    /// Whether an insert must supply a non-null value
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default_value.is_none() && !self.auto_generated
    }
}

/// Type family of a column, independent of the backend's spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SemanticType {
    Text,
    Number,
    Boolean,
    Date,
    Binary,
    Unknown,
}

impl SemanticType {
    /// Classify a declared SQL type
    ///
    /// Follows SQLite's affinity rules loosely so that arbitrary declarations
    /// such as `VARCHAR(255)` or `UNSIGNED BIG INT` land in the right family;
    /// PostgreSQL names (`int4`, `timestamptz`, `bytea`) classify the same way.
    pub fn from_declared(data_type: &str) -> Self {
        let declared = data_type.trim().to_ascii_uppercase();

        if declared.is_empty() {
            return SemanticType::Unknown;
        }
        // geometric and interval types would otherwise match "INT"
        if declared.contains("POINT") || declared.starts_with("INTERVAL") {
            return SemanticType::Unknown;
        }
        if declared.starts_with("BOOL") {
            return SemanticType::Boolean;
        }
        if declared.contains("INT") || declared.contains("SERIAL") {
            return SemanticType::Number;
        }
        if declared.contains("DATE") || declared.contains("TIMESTAMP") {
            return SemanticType::Date;
        }
        if declared.contains("CHAR")
            || declared.contains("TEXT")
            || declared.contains("CLOB")
            || declared == "NAME"
            || declared == "CITEXT"
        {
            return SemanticType::Text;
        }
        if declared.contains("BLOB") || declared == "BYTEA" {
            return SemanticType::Binary;
        }
        if declared.contains("REAL")
            || declared.contains("FLOA")
            || declared.contains("DOUB")
            || declared.contains("NUMERIC")
            || declared.contains("DECIMAL")
        {
            return SemanticType::Number;
        }

        SemanticType::Unknown
    }
}

/// Foreign key constraint information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    /// Column name in this table
    pub column: String,

    /// Referenced table name
    pub references_table: String,

    /// Referenced column name
    pub references_column: String,
}

/// Index information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    /// Index name
    pub name: String,

    /// Columns included in the index
    pub columns: Vec<String>,

    /// Whether the index enforces uniqueness
    pub unique: bool,
}

/// Information about a table (for listing)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    /// Table name
    pub name: String,

    /// Row count (if it could be read)
    pub row_count: Option<u64>,
}

/// Response from listing tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablesResponse {
    /// List of tables
    pub tables: Vec<TableInfo>,
}
