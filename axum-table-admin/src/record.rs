//! Dynamic records
//!
//! A [`Record`] is one row bound to a [`TableSchema`] value. There is a single
//! record type for every table; the schema travels with it as data.

use crate::error::{Error, Result};
use crate::schema::{ColumnInfo, TableSchema};
use crate::value::Value;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Raw attribute mapping as submitted by a form or JSON body
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// One row of a dynamically described table
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<TableSchema>,
    /// `None` means the attribute was never set
    values: Vec<Option<Value>>,
    changed: Vec<bool>,
}

impl Record {
    /// An empty record with every attribute unset
    pub fn new(schema: Arc<TableSchema>) -> Self {
        let width = schema.columns.len();
        Self {
            schema,
            values: vec![None; width],
            changed: vec![false; width],
        }
    }

    /// A record loaded from the database, one value per schema column
    pub(crate) fn loaded(schema: Arc<TableSchema>, values: Vec<Value>) -> Self {
        let width = schema.columns.len();
        Self {
            schema,
            values: values.into_iter().map(Some).collect(),
            changed: vec![false; width],
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn table_name(&self) -> &str {
        &self.schema.name
    }

    /// Current value of an attribute, `None` when unset or not a column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.schema
            .column_index(column)
            .and_then(|index| self.values[index].as_ref())
    }

    pub fn is_set(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Set one attribute to an already typed value
    pub fn set(&mut self, column: &str, value: Value) -> Result<()> {
        let index = self
            .schema
            .column_index(column)
            .ok_or_else(|| Error::validation(format!("{column} is not a column of {}", self.schema.name)))?;

        if self.values[index].as_ref() != Some(&value) {
            self.values[index] = Some(value);
            self.changed[index] = true;
        }
        Ok(())
    }

    /// Coerce and set every attribute in `attributes`
    ///
    /// All problems are collected so the caller can report them together.
    pub fn assign(&mut self, attributes: &Attributes) -> Result<()> {
        let mut problems = Vec::new();

        for (name, raw) in attributes {
            let Some(column) = self.schema.column(name) else {
                problems.push(format!("{name} is not a column of {}", self.schema.name));
                continue;
            };
            match Value::coerce(column, raw) {
                Ok(value) => self.set(name, value)?,
                Err(message) => problems.push(message),
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(problems))
        }
    }

    /// Attributes that were set, in column order
    pub fn set_attributes(&self) -> impl Iterator<Item = (&ColumnInfo, &Value)> {
        self.schema
            .columns
            .iter()
            .zip(&self.values)
            .filter_map(|(column, value)| value.as_ref().map(|value| (column, value)))
    }

    /// Attributes modified since the record was loaded or created
    pub fn changed_attributes(&self) -> impl Iterator<Item = (&ColumnInfo, &Value)> {
        self.schema
            .columns
            .iter()
            .zip(&self.values)
            .zip(&self.changed)
            .filter_map(|((column, value), changed)| match (value, changed) {
                (Some(value), true) => Some((column, value)),
                _ => None,
            })
    }

    /// Schema-derived validation for persisting this record
    ///
    /// On insert every required column must be present; on update only the
    /// changed attributes are checked.
    pub fn validate(&self, inserting: bool) -> Result<()> {
        let mut problems = Vec::new();

        for ((column, value), changed) in self.schema.columns.iter().zip(&self.values).zip(&self.changed) {
            let missing = match value {
                None => inserting && column.is_required(),
                Some(Value::Null) => (inserting || *changed) && !column.nullable && !column.auto_generated,
                Some(_) => false,
            };
            if missing {
                problems.push(format!("{} can't be blank", column.name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(problems))
        }
    }

    /// The row identity, if the table has a key and every key column is set
    pub fn primary_key(&self) -> Option<PrimaryKey> {
        if !self.schema.has_primary_key() {
            return None;
        }
        self.schema
            .primary_key
            .iter()
            .map(|name| match self.get(name) {
                Some(value) if !value.is_null() => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(PrimaryKey)
    }

    /// Values for every column in schema order, unset attributes as `Null`
    pub fn row(&self) -> Vec<Value> {
        self.values
            .iter()
            .map(|value| value.clone().unwrap_or(Value::Null))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .schema
            .columns
            .iter()
            .zip(&self.values)
            .map(|(column, value)| {
                let json = value.as_ref().map(Value::to_json).unwrap_or(serde_json::Value::Null);
                (column.name.clone(), json)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Primary key value of one row, one part per key column
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKey(Vec<(String, Value)>);

impl PrimaryKey {
    /// Parse a key from its URL form
    ///
    /// Composite keys list their parts in key-column order separated by `,`.
    /// Parts are not escaped, so a composite key whose text part contains a
    /// `,` cannot be addressed. Single-column keys are taken whole.
    /// A key that cannot match any row (wrong arity, uncoercible part) is
    /// reported as `NotFound`.
    pub fn parse(schema: &TableSchema, raw: &str) -> Result<Self> {
        if !schema.has_primary_key() {
            return Err(Error::Operation(format!(
                "table {} has no primary key",
                schema.name
            )));
        }

        let columns = schema.primary_key_columns();
        let parts: Vec<&str> = if columns.len() == 1 {
            vec![raw]
        } else {
            raw.split(',').collect()
        };
        if parts.len() != columns.len() {
            return Err(Error::not_found(&schema.name, raw));
        }

        columns
            .into_iter()
            .zip(parts)
            .map(|(column, part)| match Value::parse(column, part.trim()) {
                Ok(Value::Null) | Err(_) => Err(Error::not_found(&schema.name, raw)),
                Ok(value) => Ok((column.name.clone(), value)),
            })
            .collect::<Result<Vec<_>>>()
            .map(PrimaryKey)
    }

    pub fn parts(&self) -> &[(String, Value)] {
        &self.0
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (_, value)) in self.0.iter().enumerate() {
            if index > 0 {
                formatter.write_str(",")?;
            }
            write!(formatter, "{value}")?;
        }
        Ok(())
    }
}
