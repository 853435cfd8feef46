//! Statement builders for searches and row mutations

use crate::query::search::{Operator, Predicate, SearchRequest, Sort, SortOrder};
use crate::query::{Dialect, Statement, StatementBuilder};
use crate::record::{PrimaryKey, Record};
use crate::schema::{ColumnInfo, TableSchema};
use crate::value::{parse_flag, Value};

/// Statements and pagination resolved for one search
#[derive(Debug, Clone)]
pub struct SearchPlan {
    /// Page of rows
    pub select: Statement,

    /// Total matching rows, same filters
    pub count: Statement,

    pub page: u64,
    pub per_page: u64,

    /// Sorts actually applied, including defaults and tie-breakers
    pub sorts: Vec<Sort>,

    /// Search input that was ignored, with the reason
    pub warnings: Vec<String>,
}

/// Builds parameterized statements against a described table
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    dialect: Dialect,
}

impl QueryBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Translate a search request into a page query and a count query
    ///
    /// Unknown fields, unsupported values and bad sort input are dropped with
    /// a warning. When no usable sort remains the primary key order applies,
    /// and the key is appended as a tie-breaker so pages never overlap.
    pub fn search(&self, schema: &TableSchema, request: &SearchRequest, per_page: u64) -> SearchPlan {
        let mut warnings = request.warnings.clone();

        let mut conditions = Vec::new();
        for predicate in &request.predicates {
            let Some(column) = schema.column(&predicate.field) else {
                warn_ignored(
                    &mut warnings,
                    format!("ignoring filter on unknown field '{}'", predicate.field),
                );
                continue;
            };
            match Condition::resolve(column, predicate, &mut warnings) {
                Ok(condition) => conditions.push(condition),
                Err(reason) => warn_ignored(&mut warnings, reason),
            }
        }

        let sorts = resolve_sorts(schema, &request.sorts, &mut warnings);

        let per_page = per_page.max(1);
        let page = request.page.max(1);
        let offset = (page - 1).saturating_mul(per_page);

        let mut select = StatementBuilder::new(self.dialect);
        select.push("SELECT ").push_select_list(&schema.columns);
        select.push(" FROM ").push_identifier(&schema.name);
        push_conditions(&mut select, &conditions);
        self.push_order_by(&mut select, &sorts);
        select.push(&format!(" LIMIT {per_page} OFFSET {offset}"));

        let mut count = StatementBuilder::new(self.dialect);
        count.push("SELECT COUNT(*) FROM ").push_identifier(&schema.name);
        push_conditions(&mut count, &conditions);

        SearchPlan {
            select: select.finish(),
            count: count.finish(),
            page,
            per_page,
            sorts,
            warnings,
        }
    }

    /// Fetch one row by primary key
    pub fn find(&self, schema: &TableSchema, key: &PrimaryKey) -> Statement {
        let mut builder = StatementBuilder::new(self.dialect);
        builder.push("SELECT ").push_select_list(&schema.columns);
        builder.push(" FROM ").push_identifier(&schema.name);
        self.push_key_condition(&mut builder, schema, key);
        builder.finish()
    }

    /// Insert the set attributes of `record`, returning the stored row
    pub fn insert(&self, schema: &TableSchema, record: &Record) -> Statement {
        let assignments: Vec<(&ColumnInfo, &Value)> = record
            .set_attributes()
            .filter(|(column, value)| !(column.auto_generated && value.is_null()))
            .collect();

        let mut builder = StatementBuilder::new(self.dialect);
        builder.push("INSERT INTO ").push_identifier(&schema.name);

        if assignments.is_empty() {
            builder.push(" DEFAULT VALUES");
        } else {
            builder.push(" (");
            for (index, (column, _)) in assignments.iter().enumerate() {
                if index > 0 {
                    builder.push(", ");
                }
                builder.push_identifier(&column.name);
            }
            builder.push(") VALUES (");
            for (index, (column, value)) in assignments.iter().enumerate() {
                if index > 0 {
                    builder.push(", ");
                }
                builder.push_value_for(column, (*value).clone());
            }
            builder.push(")");
        }

        builder.push(" RETURNING ").push_select_list(&schema.columns);
        builder.finish()
    }

    /// Write the changed attributes of `record` to the row identified by `key`
    ///
    /// Returns `None` when nothing changed.
    pub fn update(&self, schema: &TableSchema, key: &PrimaryKey, record: &Record) -> Option<Statement> {
        let changes: Vec<(&ColumnInfo, &Value)> = record.changed_attributes().collect();
        if changes.is_empty() {
            return None;
        }

        let mut builder = StatementBuilder::new(self.dialect);
        builder.push("UPDATE ").push_identifier(&schema.name).push(" SET ");
        for (index, (column, value)) in changes.iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            builder.push_identifier(&column.name).push(" = ");
            builder.push_value_for(column, (*value).clone());
        }
        self.push_key_condition(&mut builder, schema, key);
        builder.push(" RETURNING ").push_select_list(&schema.columns);
        Some(builder.finish())
    }

    pub fn delete(&self, schema: &TableSchema, key: &PrimaryKey) -> Statement {
        let mut builder = StatementBuilder::new(self.dialect);
        builder.push("DELETE FROM ").push_identifier(&schema.name);
        self.push_key_condition(&mut builder, schema, key);
        builder.finish()
    }

    /// Remove every row
    pub fn truncate(&self, schema: &TableSchema) -> Statement {
        let mut builder = StatementBuilder::new(self.dialect);
        match self.dialect {
            Dialect::Sqlite => builder.push("DELETE FROM "),
            Dialect::Postgres => builder.push("TRUNCATE TABLE "),
        };
        builder.push_identifier(&schema.name);
        builder.finish()
    }

    /// Every row in key order, unfiltered
    pub fn export(&self, schema: &TableSchema) -> Statement {
        let mut builder = StatementBuilder::new(self.dialect);
        builder.push("SELECT ").push_select_list(&schema.columns);
        builder.push(" FROM ").push_identifier(&schema.name);
        let sorts = default_sorts(schema);
        self.push_order_by(&mut builder, &sorts);
        builder.finish()
    }

    fn push_key_condition(&self, builder: &mut StatementBuilder, schema: &TableSchema, key: &PrimaryKey) {
        for (index, (name, value)) in key.parts().iter().enumerate() {
            builder.push(if index == 0 { " WHERE " } else { " AND " });
            builder.push_identifier(name).push(" = ");
            match schema.column(name) {
                Some(column) => builder.push_value_for(column, value.clone()),
                None => builder.push_value(value.clone()),
            };
        }
    }

    fn push_order_by(&self, builder: &mut StatementBuilder, sorts: &[Sort]) {
        for (index, sort) in sorts.iter().enumerate() {
            builder.push(if index == 0 { " ORDER BY " } else { ", " });
            builder.push_identifier(&sort.field).push(" ").push(sort.order.keyword());
        }
    }
}

/// A filter checked against the schema, ready to render
#[derive(Debug)]
enum Condition<'a> {
    Pattern {
        column: &'a ColumnInfo,
        pattern: String,
        negated: bool,
    },
    NullCheck {
        column: &'a ColumnInfo,
        is_null: bool,
    },
    In {
        column: &'a ColumnInfo,
        values: Vec<Value>,
    },
    Compare {
        column: &'a ColumnInfo,
        operator: &'static str,
        value: Value,
    },
}

impl<'a> Condition<'a> {
    fn resolve(
        column: &'a ColumnInfo,
        predicate: &Predicate,
        warnings: &mut Vec<String>,
    ) -> Result<Self, String> {
        let value = predicate.value.as_str();

        match predicate.operator {
            Operator::Cont | Operator::NotCont | Operator::Start | Operator::End => {
                let escaped = escape_like(value);
                let pattern = match predicate.operator {
                    Operator::Start => format!("{escaped}%"),
                    Operator::End => format!("%{escaped}"),
                    _ => format!("%{escaped}%"),
                };
                Ok(Condition::Pattern {
                    column,
                    pattern,
                    negated: predicate.operator == Operator::NotCont,
                })
            }
            Operator::Null | Operator::NotNull => {
                let flag = parse_flag(value).ok_or_else(|| {
                    format!(
                        "ignoring filter {}_{}: expected true or false",
                        column.name,
                        predicate.operator.as_str()
                    )
                })?;
                Ok(Condition::NullCheck {
                    column,
                    is_null: flag == (predicate.operator == Operator::Null),
                })
            }
            Operator::In => {
                let mut values = Vec::new();
                for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
                    match Value::parse(column, part) {
                        Ok(Value::Null) => {}
                        Ok(parsed) => values.push(parsed),
                        Err(message) => warn_ignored(warnings, format!("ignoring value in {}_in: {message}", column.name)),
                    }
                }
                if values.is_empty() {
                    return Err(format!("ignoring filter {}_in: no usable values", column.name));
                }
                Ok(Condition::In { column, values })
            }
            comparison => {
                let parsed = match Value::parse(column, value) {
                    Ok(Value::Null) => {
                        return Err(format!("ignoring filter on {}: blank value", column.name))
                    }
                    Ok(parsed) => parsed,
                    Err(message) => return Err(format!("ignoring filter: {message}")),
                };
                let operator = match comparison {
                    Operator::Eq => " = ",
                    Operator::NotEq => " <> ",
                    Operator::Lt => " < ",
                    Operator::Lteq => " <= ",
                    Operator::Gt => " > ",
                    _ => " >= ",
                };
                Ok(Condition::Compare {
                    column,
                    operator,
                    value: parsed,
                })
            }
        }
    }

    fn render(&self, builder: &mut StatementBuilder) {
        match self {
            Condition::Pattern {
                column,
                pattern,
                negated,
            } => {
                let subject = builder.dialect().pattern_subject(column);
                let like = builder.dialect().like_operator(*negated);
                builder.push(&subject).push(" ").push(like).push(" ");
                builder.push_value(Value::Text(pattern.clone()));
                builder.push(" ESCAPE '\\'");
            }
            Condition::NullCheck { column, is_null } => {
                builder.push_identifier(&column.name);
                builder.push(if *is_null { " IS NULL" } else { " IS NOT NULL" });
            }
            Condition::In { column, values } => {
                builder.push_identifier(&column.name).push(" IN (");
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        builder.push(", ");
                    }
                    builder.push_value_for(column, value.clone());
                }
                builder.push(")");
            }
            Condition::Compare {
                column,
                operator,
                value,
            } => {
                builder.push_identifier(&column.name).push(operator);
                builder.push_value_for(column, value.clone());
            }
        }
    }
}

fn push_conditions(builder: &mut StatementBuilder, conditions: &[Condition<'_>]) {
    for (index, condition) in conditions.iter().enumerate() {
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        condition.render(builder);
    }
}

fn resolve_sorts(schema: &TableSchema, requested: &[Sort], warnings: &mut Vec<String>) -> Vec<Sort> {
    let mut sorts: Vec<Sort> = Vec::new();
    for sort in requested {
        if schema.column(&sort.field).is_none() {
            warn_ignored(warnings, format!("ignoring sort on unknown field '{}'", sort.field));
            continue;
        }
        if sorts.iter().all(|existing| existing.field != sort.field) {
            sorts.push(sort.clone());
        }
    }

    for tie_breaker in default_sorts(schema) {
        if sorts.iter().all(|existing| existing.field != tie_breaker.field) {
            sorts.push(tie_breaker);
        }
    }
    sorts
}

/// Primary key order, or the first column for keyless tables
fn default_sorts(schema: &TableSchema) -> Vec<Sort> {
    let fields: Vec<String> = if schema.has_primary_key() {
        schema.primary_key.clone()
    } else {
        schema.columns.first().map(|column| column.name.clone()).into_iter().collect()
    };
    fields
        .into_iter()
        .map(|field| Sort {
            field,
            order: SortOrder::Ascending,
        })
        .collect()
}

fn warn_ignored(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{}", message);
    warnings.push(message);
}

/// Escape LIKE wildcards so user text matches literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        if matches!(character, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}
