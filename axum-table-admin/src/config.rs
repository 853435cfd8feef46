//! Runtime configuration
//!
//! Built once at startup and shared read-only. The sandbox flag lives here and
//! is threaded through the facade and the mutation guard explicitly.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// Admin configuration surface
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminConfig {
    /// Read-only mode: every mutation becomes a reported no-op
    pub sandbox: bool,

    /// Tables hidden from the catalog (exact names or `prefix*` patterns)
    pub denied_tables: Vec<String>,

    /// Page size used when a request does not ask for one
    pub per_page: u64,

    /// Upper bound for any requested page size
    pub max_per_page: u64,

    /// Hide the underlying database message in failure outcomes
    pub redact_error_details: bool,

    /// Timeout applied to every database round trip
    #[serde(with = "duration_seconds")]
    pub statement_timeout: Duration,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            sandbox: false,
            denied_tables: vec![
                "schema_migrations".to_string(),
                "ar_internal_metadata".to_string(),
                "_sqlx_migrations".to_string(),
            ],
            per_page: 10,
            max_per_page: 500,
            redact_error_details: false,
            statement_timeout: Duration::from_secs(30),
        }
    }
}

impl AdminConfig {
    /// Read configuration from `TABLE_ADMIN_*` environment variables
    ///
    /// Unset variables keep their defaults. A variable that is set but cannot
    /// be parsed is an error rather than being silently ignored.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AdminConfig::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("TABLE_ADMIN_SANDBOX") {
            config.sandbox = parse_flag("TABLE_ADMIN_SANDBOX", &value)?;
        }
        if let Some(value) = lookup("TABLE_ADMIN_DENIED_TABLES") {
            config.denied_tables = value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("TABLE_ADMIN_PER_PAGE") {
            config.per_page = parse_number("TABLE_ADMIN_PER_PAGE", &value)?;
        }
        if let Some(value) = lookup("TABLE_ADMIN_MAX_PER_PAGE") {
            config.max_per_page = parse_number("TABLE_ADMIN_MAX_PER_PAGE", &value)?;
        }
        if let Some(value) = lookup("TABLE_ADMIN_REDACT_ERRORS") {
            config.redact_error_details = parse_flag("TABLE_ADMIN_REDACT_ERRORS", &value)?;
        }
        if let Some(value) = lookup("TABLE_ADMIN_STATEMENT_TIMEOUT_SECS") {
            let seconds = parse_number("TABLE_ADMIN_STATEMENT_TIMEOUT_SECS", &value)?;
            config.statement_timeout = Duration::from_secs(seconds);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_per_page == 0 {
            return Err(Error::Configuration(
                "max_per_page must be greater than zero".to_string(),
            ));
        }
        if self.per_page == 0 || self.per_page > self.max_per_page {
            return Err(Error::Configuration(format!(
                "per_page must be between 1 and {}",
                self.max_per_page
            )));
        }
        if self.statement_timeout.is_zero() {
            return Err(Error::Configuration(
                "statement_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the page size for a request
    ///
    /// Always at least 1, even for a configuration that never went through
    /// [`AdminConfig::validate`].
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.per_page)
            .clamp(1, self.max_per_page.max(1))
    }

    /// Whether the catalog must hide this table
    pub fn is_denied(&self, table: &str) -> bool {
        self.denied_tables.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => table.starts_with(prefix),
            None => pattern == table,
        })
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Configuration(format!(
            "{key}: expected a boolean, got '{other}'"
        ))),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Configuration(format!("{key}: expected a number, got '{value}'")))
}

mod duration_seconds {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AdminConfig::from_lookup(|_| None).unwrap();
        assert!(!config.sandbox);
        assert_eq!(config.per_page, 10);
        assert!(config.is_denied("schema_migrations"));
    }

    #[test]
    fn test_environment_overrides() {
        let config = AdminConfig::from_lookup(lookup_from(&[
            ("TABLE_ADMIN_SANDBOX", "true"),
            ("TABLE_ADMIN_DENIED_TABLES", "secrets, audit_*"),
            ("TABLE_ADMIN_PER_PAGE", "25"),
        ]))
        .unwrap();

        assert!(config.sandbox);
        assert_eq!(config.per_page, 25);
        assert!(config.is_denied("secrets"));
        assert!(config.is_denied("audit_log"));
        assert!(!config.is_denied("orders"));
    }

    #[test]
    fn test_unparsable_value_is_rejected() {
        let result = AdminConfig::from_lookup(lookup_from(&[("TABLE_ADMIN_PER_PAGE", "many")]));
        assert!(matches!(result, Err(Error::Configuration(_))));

        let result = AdminConfig::from_lookup(lookup_from(&[("TABLE_ADMIN_SANDBOX", "maybe")]));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_page_size_is_clamped() {
        let config = AdminConfig::default();
        assert_eq!(config.page_size(None), 10);
        assert_eq!(config.page_size(Some(0)), 1);
        assert_eq!(config.page_size(Some(100_000)), 500);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: AdminConfig =
            serde_json::from_str(r#"{"sandbox": true, "statementTimeout": 5}"#).unwrap();
        assert!(config.sandbox);
        assert_eq!(config.statement_timeout, Duration::from_secs(5));
        assert_eq!(config.max_per_page, 500);
    }

    #[test]
    fn test_unvalidated_zero_maximum_still_yields_a_page_size() {
        let config: AdminConfig = serde_json::from_str(r#"{"maxPerPage": 0}"#).unwrap();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
        assert_eq!(config.page_size(None), 1);
        assert_eq!(config.page_size(Some(50)), 1);
    }
}
