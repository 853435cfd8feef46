//! Error taxonomy shared by every layer of the admin core
//!
//! Driver faults never escape raw: `From<sqlx::Error>` sorts each one into a
//! category the web layer knows how to present.

use serde::Serialize;
use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// The table does not exist (or is not accessible) at call time
    #[error("Table not found: {0}")]
    UnknownTable(String),

    /// No row matches the given primary key
    #[error("Record not found in {table}: {key}")]
    NotFound { table: String, key: String },

    /// Submitted attributes failed schema-derived validation
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// The database rejected the statement because of a constraint
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The connection could not be used (I/O, pool exhaustion, timeout)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The operation is not possible for this table or was rejected
    #[error("Operation not permitted: {0}")]
    Operation(String),

    /// Unclassified database fault
    #[error("Database error: {0}")]
    Unknown(String),

    /// Invalid configuration input
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse category of an [`Error`], as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    UnknownTable,
    NotFound,
    Validation,
    Constraint,
    Connection,
    Operation,
    Unknown,
    Configuration,
}

impl Error {
    /// Shorthand for a single-message validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(vec![message.into()])
    }

    pub fn not_found(table: impl Into<String>, key: impl Into<String>) -> Self {
        Error::NotFound {
            table: table.into(),
            key: key.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnknownTable(_) => ErrorCategory::UnknownTable,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Validation(_) => ErrorCategory::Validation,
            Error::Constraint(_) => ErrorCategory::Constraint,
            Error::Connection(_) => ErrorCategory::Connection,
            Error::Operation(_) => ErrorCategory::Operation,
            Error::Unknown(_) => ErrorCategory::Unknown,
            Error::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match error {
            sqlx::Error::Database(database_error) => match database_error.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    Error::Constraint(database_error.message().to_string())
                }
                _ => {
                    let message = database_error.message().to_string();
                    if is_type_mismatch(&message) {
                        Error::Validation(vec![message])
                    } else {
                        Error::Unknown(message)
                    }
                }
            },
            sqlx::Error::RowNotFound => Error::NotFound {
                table: String::new(),
                key: String::new(),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Error::Connection(error.to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. } => Error::Validation(vec![error.to_string()]),
            other => Error::Unknown(other.to_string()),
        }
    }
}

/// Driver messages that mean "this value does not fit this column"
fn is_type_mismatch(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("datatype mismatch")
        || lowered.contains("invalid input syntax")
        || lowered.contains("out of range")
        || lowered.contains("is of type")
}
