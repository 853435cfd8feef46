//! Parameterized statement construction
//!
//! Every statement is built twice in lockstep: the executable SQL with
//! placeholders, and a display rendering where each bound parameter is shown
//! as an escaped SQL literal. User input only ever reaches the database as a
//! bound parameter; identifiers come from the introspected schema and are
//! quoted.

pub mod builder;
pub mod search;

pub use builder::{QueryBuilder, SearchPlan};
pub use search::{Operator, Predicate, SearchRequest, Sort, SortOrder};

use crate::schema::{ColumnInfo, SemanticType};
use crate::value::Value;

/// SQL flavour of the connected database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Quote an identifier (table or column name) to prevent SQL injection
    ///
    /// Both SQLite and PostgreSQL use double quotes for identifiers. Embedded
    /// double quotes are escaped by doubling them.
    pub fn quote_identifier(self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    /// Placeholder for the `index`-th bound parameter (1-based)
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Sqlite => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }

    /// Case-insensitive pattern match operator
    fn like_operator(self, negated: bool) -> &'static str {
        match (self, negated) {
            (Dialect::Sqlite, false) => "LIKE",
            (Dialect::Sqlite, true) => "NOT LIKE",
            (Dialect::Postgres, false) => "ILIKE",
            (Dialect::Postgres, true) => "NOT ILIKE",
        }
    }

    /// Column expression usable on the left of a pattern match
    fn pattern_subject(self, column: &ColumnInfo) -> String {
        let quoted = self.quote_identifier(&column.name);
        match (self, column.semantic_type) {
            (Dialect::Postgres, SemanticType::Text) | (Dialect::Sqlite, _) => quoted,
            (Dialect::Postgres, _) => format!("CAST({quoted} AS TEXT)"),
        }
    }

    /// Expression selecting `column` so the provider can decode it
    ///
    /// PostgreSQL types without a native decoder (uuid, json, numeric, enums,
    /// ...) are read back as text.
    fn select_expression(self, column: &ColumnInfo) -> String {
        let quoted = self.quote_identifier(&column.name);
        match self {
            Dialect::Sqlite => quoted,
            Dialect::Postgres if postgres_reads_as_text(column) => {
                format!("CAST({quoted} AS TEXT) AS {quoted}")
            }
            Dialect::Postgres => quoted,
        }
    }

    /// Type name a PostgreSQL parameter must be cast to, if any
    fn parameter_cast(self, column: &ColumnInfo) -> Option<String> {
        if self != Dialect::Postgres || column.semantic_type != SemanticType::Unknown {
            return None;
        }
        let plain = column
            .data_type
            .chars()
            .all(|character| character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_' || character == ' ');
        if plain {
            Some(column.data_type.clone())
        } else {
            Some(self.quote_identifier(&column.data_type))
        }
    }

    /// Render a value as an escaped SQL literal (display only)
    pub fn literal(self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Text(text) => quote_string(text),
            Value::Integer(number) => number.to_string(),
            Value::Real(number) if number.is_finite() => format!("{number:?}"),
            Value::Real(number) => quote_string(&number.to_string()),
            Value::Boolean(true) => "TRUE".to_string(),
            Value::Boolean(false) => "FALSE".to_string(),
            Value::Date(_) | Value::Timestamp(_) => quote_string(&value.to_string()),
            Value::Binary(bytes) => {
                let encoded = hex::encode_upper(bytes);
                match self {
                    Dialect::Sqlite => format!("X'{encoded}'"),
                    Dialect::Postgres => format!("'\\x{encoded}'::bytea"),
                }
            }
        }
    }
}

fn postgres_reads_as_text(column: &ColumnInfo) -> bool {
    match column.semantic_type {
        SemanticType::Unknown => true,
        SemanticType::Number => {
            let declared = column.data_type.to_ascii_uppercase();
            declared.contains("NUMERIC") || declared.contains("DECIMAL")
        }
        _ => false,
    }
}

fn quote_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// A ready-to-execute statement
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL with placeholders
    pub sql: String,

    /// Values bound to the placeholders, in order
    pub params: Vec<Value>,

    /// Human-readable SQL with parameters rendered as escaped literals
    pub display: String,
}

/// Accumulates a [`Statement`]
#[derive(Debug)]
pub(crate) struct StatementBuilder {
    dialect: Dialect,
    sql: String,
    display: String,
    params: Vec<Value>,
}

impl StatementBuilder {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            display: String::new(),
            params: Vec::new(),
        }
    }

    pub(crate) fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Append trusted SQL text
    pub(crate) fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self.display.push_str(text);
        self
    }

    pub(crate) fn push_identifier(&mut self, identifier: &str) -> &mut Self {
        let quoted = self.dialect.quote_identifier(identifier);
        self.push(&quoted)
    }

    /// Append a bound parameter
    ///
    /// `Null` is written as the `NULL` keyword instead of being bound, which
    /// sidesteps parameter typing of untyped nulls.
    pub(crate) fn push_value(&mut self, value: Value) -> &mut Self {
        self.push_parameter(value, None)
    }

    /// Append a bound parameter destined for `column`
    pub(crate) fn push_value_for(&mut self, column: &ColumnInfo, value: Value) -> &mut Self {
        let cast = self.dialect.parameter_cast(column);
        self.push_parameter(value, cast)
    }

    fn push_parameter(&mut self, value: Value, cast: Option<String>) -> &mut Self {
        if value.is_null() {
            return self.push("NULL");
        }

        self.display.push_str(&self.dialect.literal(&value));
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        match cast {
            Some(type_name) => {
                self.sql.push_str(&format!("CAST({placeholder} AS {type_name})"));
            }
            None => self.sql.push_str(&placeholder),
        }
        self
    }

    /// Append the select list for `columns`
    pub(crate) fn push_select_list(&mut self, columns: &[ColumnInfo]) -> &mut Self {
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                self.push(", ");
            }
            let expression = self.dialect.select_expression(column);
            self.push(&expression);
        }
        self
    }

    pub(crate) fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
            display: self.display,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::Sqlite.quote_identifier("users"), "\"users\"");
        assert_eq!(
            Dialect::Postgres.quote_identifier("table\"name"),
            "\"table\"\"name\""
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Sqlite.placeholder(3), "?");
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
    }

    #[test]
    fn test_literals_are_escaped() {
        assert_eq!(
            Dialect::Sqlite.literal(&Value::Text("O'Brien'; --".to_string())),
            "'O''Brien''; --'"
        );
        assert_eq!(Dialect::Sqlite.literal(&Value::Binary(vec![1, 171])), "X'01AB'");
        assert_eq!(
            Dialect::Postgres.literal(&Value::Binary(vec![1, 171])),
            "'\\x01AB'::bytea"
        );
        assert_eq!(Dialect::Sqlite.literal(&Value::Real(2.5)), "2.5");
        assert_eq!(Dialect::Sqlite.literal(&Value::Boolean(true)), "TRUE");
    }

    #[test]
    fn test_builder_keeps_sql_and_display_in_step() {
        let mut builder = StatementBuilder::new(Dialect::Postgres);
        builder
            .push("SELECT 1 WHERE ")
            .push_identifier("name")
            .push(" = ")
            .push_value(Value::Text("x'y".to_string()))
            .push(" AND ")
            .push_identifier("age")
            .push(" = ")
            .push_value(Value::Null);
        let statement = builder.finish();

        assert_eq!(statement.sql, "SELECT 1 WHERE \"name\" = $1 AND \"age\" = NULL");
        assert_eq!(
            statement.display,
            "SELECT 1 WHERE \"name\" = 'x''y' AND \"age\" = NULL"
        );
        assert_eq!(statement.params, vec![Value::Text("x'y".to_string())]);
    }

    #[test]
    fn test_postgres_unknown_types_are_cast() {
        let column = ColumnInfo::new("token", "uuid");
        let mut builder = StatementBuilder::new(Dialect::Postgres);
        builder.push_value_for(&column, Value::Text("abc".to_string()));
        assert_eq!(builder.finish().sql, "CAST($1 AS uuid)");

        let mut builder = StatementBuilder::new(Dialect::Sqlite);
        builder.push_value_for(&column, Value::Text("abc".to_string()));
        assert_eq!(builder.finish().sql, "?");
    }
}
