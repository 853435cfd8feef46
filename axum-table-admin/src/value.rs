//! Typed cell values
//!
//! Rows of tables whose shape is only known at runtime are held as a tagged
//! union per cell, chosen from the column's [`SemanticType`].

use crate::schema::{ColumnInfo, SemanticType};
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Binary(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Coerce raw submitted input into a value for `column`
    ///
    /// Blank strings become `Null` for every non-text column. Binary columns
    /// take base64 text, the form [`Value::to_json`] writes, or a byte array.
    /// The error is a user-facing message naming the column.
    pub fn coerce(column: &ColumnInfo, raw: &serde_json::Value) -> Result<Value, String> {
        use serde_json::Value as Json;

        if raw.is_null() {
            return Ok(Value::Null);
        }

        if column.semantic_type == SemanticType::Text {
            return Ok(match raw {
                Json::String(text) => Value::Text(text.clone()),
                Json::Number(number) => Value::Text(number.to_string()),
                Json::Bool(flag) => Value::Text(flag.to_string()),
                other => Value::Text(other.to_string()),
            });
        }

        if let Json::String(text) = raw {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
        }

        match column.semantic_type {
            SemanticType::Number => coerce_number(column, raw),
            SemanticType::Boolean => coerce_boolean(column, raw),
            SemanticType::Date => coerce_date(column, raw),
            SemanticType::Binary => match raw {
                Json::String(text) => base64::engine::general_purpose::STANDARD
                    .decode(text.trim())
                    .map(Value::Binary)
                    .map_err(|_| format!("{} is not valid base64", column.name)),
                Json::Array(items) => items
                    .iter()
                    .map(|item| item.as_u64().and_then(|byte| u8::try_from(byte).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .map(Value::Binary)
                    .ok_or_else(|| format!("{} is not valid binary data", column.name)),
                _ => Err(format!("{} is not valid binary data", column.name)),
            },
            SemanticType::Text | SemanticType::Unknown => Ok(match raw {
                Json::String(text) => Value::Text(text.clone()),
                other => Value::Text(other.to_string()),
            }),
        }
    }

    /// Parse a value typed in a URL (primary keys, filter input)
    pub fn parse(column: &ColumnInfo, raw: &str) -> Result<Value, String> {
        Self::coerce(column, &serde_json::Value::String(raw.to_string()))
    }

    /// JSON rendering used by the web layer
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Text(text) => Json::String(text.clone()),
            Value::Integer(number) => Json::Number((*number).into()),
            Value::Real(number) => serde_json::Number::from_f64(*number)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(number.to_string())),
            Value::Boolean(flag) => Json::Bool(*flag),
            Value::Date(date) => Json::String(date.format(DATE_FORMAT).to_string()),
            Value::Timestamp(timestamp) => {
                Json::String(timestamp.format(TIMESTAMP_FORMAT).to_string())
            }
            Value::Binary(bytes) => {
                Json::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(text) => formatter.write_str(text),
            Value::Integer(number) => write!(formatter, "{number}"),
            Value::Real(number) => write!(formatter, "{number}"),
            Value::Boolean(flag) => write!(formatter, "{flag}"),
            Value::Date(date) => write!(formatter, "{}", date.format(DATE_FORMAT)),
            Value::Timestamp(timestamp) => {
                write!(formatter, "{}", timestamp.format(TIMESTAMP_FORMAT))
            }
            Value::Binary(bytes) => write!(formatter, "[BLOB: {} bytes]", bytes.len()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn coerce_number(column: &ColumnInfo, raw: &serde_json::Value) -> Result<Value, String> {
    use serde_json::Value as Json;

    let integral = column.is_integral();
    match raw {
        Json::Number(number) if integral => number
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| format!("{} must be an integer", column.name)),
        Json::Number(number) => number
            .as_f64()
            .map(Value::Real)
            .ok_or_else(|| format!("{} is not a number", column.name)),
        Json::String(text) if integral => text
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| format!("{} must be an integer", column.name)),
        Json::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .map(Value::Real)
            .ok_or_else(|| format!("{} is not a number", column.name)),
        _ => Err(format!("{} is not a number", column.name)),
    }
}

fn coerce_boolean(column: &ColumnInfo, raw: &serde_json::Value) -> Result<Value, String> {
    use serde_json::Value as Json;

    match raw {
        Json::Bool(flag) => Ok(Value::Boolean(*flag)),
        Json::Number(number) => match number.as_i64() {
            Some(0) => Ok(Value::Boolean(false)),
            Some(1) => Ok(Value::Boolean(true)),
            _ => Err(format!("{} must be true or false", column.name)),
        },
        Json::String(text) => parse_flag(text)
            .map(Value::Boolean)
            .ok_or_else(|| format!("{} must be true or false", column.name)),
        _ => Err(format!("{} must be true or false", column.name)),
    }
}

fn coerce_date(column: &ColumnInfo, raw: &serde_json::Value) -> Result<Value, String> {
    let text = match raw {
        serde_json::Value::String(text) => text.trim(),
        _ => return Err(format!("{} is not a valid date", column.name)),
    };

    if column.has_time() {
        parse_timestamp(text)
            .map(Value::Timestamp)
            .ok_or_else(|| format!("{} is not a valid date and time", column.name))
    } else {
        NaiveDate::parse_from_str(text, DATE_FORMAT)
            .ok()
            .or_else(|| parse_timestamp(text).map(|timestamp| timestamp.date()))
            .map(Value::Date)
            .ok_or_else(|| format!("{} is not a valid date", column.name))
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|timestamp| timestamp.naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Loose truthiness as submitted by HTML forms and query strings
pub(crate) fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn column(name: &str, data_type: &str) -> ColumnInfo {
        ColumnInfo::new(name, data_type)
    }

    #[test]
    fn test_blank_string_becomes_null_for_non_text_columns() {
        assert_eq!(Value::coerce(&column("age", "INTEGER"), &json!("")).unwrap(), Value::Null);
        assert_eq!(Value::coerce(&column("born", "DATE"), &json!("  ")).unwrap(), Value::Null);
        assert_eq!(
            Value::coerce(&column("name", "TEXT"), &json!("")).unwrap(),
            Value::Text(String::new())
        );
    }

    #[test]
    fn test_numbers() {
        let quantity = column("quantity", "INTEGER");
        assert_eq!(Value::coerce(&quantity, &json!("42")).unwrap(), Value::Integer(42));
        assert_eq!(Value::coerce(&quantity, &json!(7)).unwrap(), Value::Integer(7));
        assert_eq!(
            Value::coerce(&quantity, &json!("4.5")).unwrap_err(),
            "quantity must be an integer"
        );

        let price = column("price", "REAL");
        assert_eq!(Value::coerce(&price, &json!("9.99")).unwrap(), Value::Real(9.99));
        assert_eq!(Value::coerce(&price, &json!(3)).unwrap(), Value::Real(3.0));
        assert!(Value::coerce(&price, &json!("cheap")).is_err());
    }

    #[test]
    fn test_booleans() {
        let active = column("active", "BOOLEAN");
        assert_eq!(Value::coerce(&active, &json!("on")).unwrap(), Value::Boolean(true));
        assert_eq!(Value::coerce(&active, &json!("0")).unwrap(), Value::Boolean(false));
        assert_eq!(Value::coerce(&active, &json!(true)).unwrap(), Value::Boolean(true));
        assert!(Value::coerce(&active, &json!("perhaps")).is_err());
    }

    #[test]
    fn test_dates_and_timestamps() {
        let born = column("born_on", "DATE");
        assert_eq!(
            Value::coerce(&born, &json!("2021-03-04")).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2021, 3, 4).unwrap())
        );

        let created = column("created_at", "DATETIME");
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap();
        assert_eq!(
            Value::coerce(&created, &json!("2021-03-04 05:06:07")).unwrap(),
            Value::Timestamp(expected)
        );
        assert_eq!(
            Value::coerce(&created, &json!("2021-03-04T05:06:07Z")).unwrap(),
            Value::Timestamp(expected)
        );
        assert!(Value::coerce(&created, &json!("yesterday")).is_err());
    }

    #[test]
    fn test_fractional_seconds_are_kept() {
        let created = column("created_at", "DATETIME");
        let value = Value::coerce(&created, &json!("2024-01-01 10:00:00.250")).unwrap();
        assert_eq!(value.to_json(), json!("2024-01-01 10:00:00.250"));
        assert_eq!(Value::coerce(&created, &value.to_json()).unwrap(), value);

        let whole = Value::coerce(&created, &json!("2024-01-01 10:00:00")).unwrap();
        assert_eq!(whole.to_string(), "2024-01-01 10:00:00");
    }

    #[test]
    fn test_binary_reads_back_what_it_writes() {
        let data = column("data", "BLOB");
        let value = Value::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(Value::coerce(&data, &value.to_json()).unwrap(), value);
        assert_eq!(
            Value::coerce(&data, &json!([1, 2, 255])).unwrap(),
            Value::Binary(vec![1, 2, 255])
        );
        assert_eq!(
            Value::coerce(&data, &json!("not base64!")).unwrap_err(),
            "data is not valid base64"
        );
    }

    #[test]
    fn test_json_rendering() {
        assert_eq!(Value::Integer(3).to_json(), json!(3));
        assert_eq!(Value::Null.to_json(), json!(null));
        assert_eq!(Value::Binary(b"hi".to_vec()).to_json(), json!("aGk="));
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()).to_json(),
            json!("2020-01-02")
        );
    }
}
