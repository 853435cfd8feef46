//! Mutation guard
//!
//! Every write goes through [`MutationGuard::run`]. In sandbox mode the write
//! is never started; otherwise its result is folded into an [`Outcome`]
//! carrying a message fit for display.

use crate::error::{Error, ErrorCategory};
use serde::{Serialize, Serializer};
use std::future::Future;

/// Kind of write being guarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Create,
    Update,
    Delete,
    Truncate,
}

impl Mutation {
    pub fn as_str(self) -> &'static str {
        match self {
            Mutation::Create => "create",
            Mutation::Update => "update",
            Mutation::Delete => "delete",
            Mutation::Truncate => "truncate",
        }
    }

    fn subject(self) -> &'static str {
        match self {
            Mutation::Truncate => "table",
            _ => "record",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Mutation::Create => "created",
            Mutation::Update => "updated",
            Mutation::Delete => "deleted",
            Mutation::Truncate => "truncated",
        }
    }

    fn progressive(self) -> &'static str {
        match self {
            Mutation::Create => "creating",
            Mutation::Update => "updating",
            Mutation::Delete => "deleting",
            Mutation::Truncate => "truncating",
        }
    }

    fn success_message(self) -> String {
        let subject = match self {
            Mutation::Truncate => "Table",
            _ => "Record",
        };
        format!("{subject} has been {} successfully.", self.past_tense())
    }

    fn skipped_message(self) -> String {
        format!(
            "Sandbox mode is enabled: the {} was not {}.",
            self.subject(),
            self.past_tense()
        )
    }
}

/// Result of a guarded write
#[derive(Debug)]
pub enum Outcome<T> {
    /// The write was committed
    Success { value: T, message: String },

    /// Sandbox mode: nothing was sent to the database
    Skipped { message: String },

    /// The write failed and nothing was committed
    Failed { error: Error, message: String },
}

impl<T> Outcome<T> {
    pub fn message(&self) -> &str {
        match self {
            Outcome::Success { message, .. }
            | Outcome::Skipped { message }
            | Outcome::Failed { message, .. } => message,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Outcome::Success { .. } => OutcomeStatus::Success,
            Outcome::Skipped { .. } => OutcomeStatus::Skipped,
            Outcome::Failed { error, .. } => OutcomeStatus::Failed(error.category()),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Success { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    pub fn map<U>(self, transform: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success { value, message } => Outcome::Success {
                value: transform(value),
                message,
            },
            Outcome::Skipped { message } => Outcome::Skipped { message },
            Outcome::Failed { error, message } => Outcome::Failed { error, message },
        }
    }
}

/// Serializable summary of an [`Outcome`]: `success`, `skipped` or the error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Skipped,
    Failed(ErrorCategory),
}

impl Serialize for OutcomeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OutcomeStatus::Success => serializer.serialize_str("success"),
            OutcomeStatus::Skipped => serializer.serialize_str("skipped"),
            OutcomeStatus::Failed(category) => category.serialize(serializer),
        }
    }
}

/// Gate for all writes
#[derive(Debug, Clone, Copy, Default)]
pub struct MutationGuard {
    sandbox: bool,
    redact_error_details: bool,
}

impl MutationGuard {
    pub fn new(sandbox: bool, redact_error_details: bool) -> Self {
        Self {
            sandbox,
            redact_error_details,
        }
    }

    /// Run `operation` unless sandbox mode is on
    ///
    /// The closure is not called at all in sandbox mode, so no connection is
    /// even acquired.
    pub async fn run<T, F, Fut>(&self, mutation: Mutation, table: &str, operation: F) -> Outcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = crate::error::Result<T>>,
    {
        if self.sandbox {
            tracing::warn!(table, mutation = mutation.as_str(), "sandbox mode, mutation skipped");
            return Outcome::Skipped {
                message: mutation.skipped_message(),
            };
        }

        match operation().await {
            Ok(value) => {
                tracing::info!(table, mutation = mutation.as_str(), "mutation committed");
                Outcome::Success {
                    value,
                    message: mutation.success_message(),
                }
            }
            Err(error) => {
                tracing::error!(table, mutation = mutation.as_str(), %error, "mutation failed");
                Outcome::Failed {
                    message: self.failure_message(mutation, &error),
                    error,
                }
            }
        }
    }

    fn failure_message(&self, mutation: Mutation, error: &Error) -> String {
        let prefix = format!(
            "There was an error {} the {}",
            mutation.progressive(),
            mutation.subject()
        );
        let redacted = self.redact_error_details
            && matches!(
                error.category(),
                ErrorCategory::Constraint | ErrorCategory::Connection | ErrorCategory::Unknown
            );
        if redacted {
            format!("{prefix}.")
        } else {
            format!("{prefix}: {error}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_sandbox_never_runs_the_operation() {
        let guard = MutationGuard::new(true, false);
        let ran = AtomicBool::new(false);

        let outcome = guard
            .run(Mutation::Truncate, "orders", || async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(outcome.is_skipped());
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(
            outcome.message(),
            "Sandbox mode is enabled: the table was not truncated."
        );
        assert_eq!(serde_json::to_value(outcome.status()).unwrap(), "skipped");
    }

    #[tokio::test]
    async fn test_success_message() {
        let guard = MutationGuard::default();
        let outcome = guard.run(Mutation::Create, "users", || async { Ok(7) }).await;

        assert_eq!(outcome.value(), Some(&7));
        assert_eq!(outcome.message(), "Record has been created successfully.");
        assert_eq!(serde_json::to_value(outcome.status()).unwrap(), "success");
    }

    #[tokio::test]
    async fn test_failures_are_categorized() {
        let guard = MutationGuard::default();
        let outcome: Outcome<()> = guard
            .run(Mutation::Delete, "users", || async {
                Err(Error::Constraint("FOREIGN KEY constraint failed".to_string()))
            })
            .await;

        assert_eq!(
            outcome.message(),
            "There was an error deleting the record: Constraint violation: FOREIGN KEY constraint failed"
        );
        assert_eq!(serde_json::to_value(outcome.status()).unwrap(), "constraint");
    }

    #[tokio::test]
    async fn test_redaction_keeps_validation_messages() {
        let guard = MutationGuard::new(false, true);

        let constraint: Outcome<()> = guard
            .run(Mutation::Update, "users", || async {
                Err(Error::Constraint("UNIQUE constraint failed: users.email".to_string()))
            })
            .await;
        assert_eq!(constraint.message(), "There was an error updating the record.");

        let validation: Outcome<()> = guard
            .run(Mutation::Update, "users", || async {
                Err(Error::validation("email can't be blank"))
            })
            .await;
        assert!(validation.message().ends_with("email can't be blank"));
    }
}
