//! Per-table attribute normalization hooks
//!
//! Hooks run on the raw submitted attributes before coercion and validation,
//! for both inserts and updates. They are registered by table name so the
//! core stays table-agnostic.

use crate::record::Attributes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Rewrites submitted attributes for one table
pub trait Normalizer: Send + Sync + 'static {
    fn normalize(&self, attributes: &mut Attributes);
}

impl<F> Normalizer for F
where
    F: Fn(&mut Attributes) + Send + Sync + 'static,
{
    fn normalize(&self, attributes: &mut Attributes) {
        self(attributes)
    }
}

/// Turns blank strings in the named fields into `null`
///
/// Fields absent from the submission are left absent.
#[derive(Debug, Clone)]
pub struct BlankToNull {
    fields: Vec<String>,
}

impl BlankToNull {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Normalizer for BlankToNull {
    fn normalize(&self, attributes: &mut Attributes) {
        for field in &self.fields {
            if let Some(value) = attributes.get_mut(field) {
                let blank = value.as_str().is_some_and(|text| text.trim().is_empty());
                if blank {
                    *value = serde_json::Value::Null;
                }
            }
        }
    }
}

/// Registry of hooks keyed by table name
#[derive(Clone, Default)]
pub struct Normalizers {
    hooks: HashMap<String, Vec<Arc<dyn Normalizer>>>,
}

impl Normalizers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for `table`; hooks run in registration order
    pub fn register(mut self, table: impl Into<String>, normalizer: impl Normalizer) -> Self {
        self.hooks
            .entry(table.into())
            .or_default()
            .push(Arc::new(normalizer));
        self
    }

    /// Apply every hook registered for `table`
    pub fn apply(&self, table: &str, attributes: &mut Attributes) {
        if let Some(hooks) = self.hooks.get(table) {
            for hook in hooks {
                hook.normalize(attributes);
            }
        }
    }

    pub fn has_hooks(&self, table: &str) -> bool {
        self.hooks.get(table).is_some_and(|hooks| !hooks.is_empty())
    }
}

impl fmt::Debug for Normalizers {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tables: Vec<&String> = self.hooks.keys().collect();
        tables.sort();
        formatter.debug_struct("Normalizers").field("tables", &tables).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attributes(value: serde_json::Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_blank_to_null_only_touches_named_fields() {
        let normalizers = Normalizers::new().register(
            "users",
            BlankToNull::new(["stripe_account", "agreement_embed_url"]),
        );

        let mut submitted = attributes(json!({
            "name": "",
            "stripe_account": "   ",
            "agreement_embed_url": "https://example.com/a",
        }));
        normalizers.apply("users", &mut submitted);

        assert_eq!(submitted["name"], json!(""));
        assert_eq!(submitted["stripe_account"], json!(null));
        assert_eq!(submitted["agreement_embed_url"], json!("https://example.com/a"));
        assert!(!submitted.contains_key("missing"));
    }

    #[test]
    fn test_hooks_are_scoped_to_their_table() {
        let normalizers = Normalizers::new().register("users", BlankToNull::new(["name"]));

        let mut submitted = attributes(json!({"name": ""}));
        normalizers.apply("orders", &mut submitted);
        assert_eq!(submitted["name"], json!(""));
        assert!(normalizers.has_hooks("users"));
        assert!(!normalizers.has_hooks("orders"));
    }

    #[test]
    fn test_closure_hooks() {
        let normalizers = Normalizers::new().register("products", |attributes: &mut Attributes| {
            if let Some(serde_json::Value::String(name)) = attributes.get_mut("name") {
                *name = name.trim().to_string();
            }
        });

        let mut submitted = attributes(json!({"name": "  Lamp "}));
        normalizers.apply("products", &mut submitted);
        assert_eq!(submitted["name"], json!("Lamp"));
    }
}
