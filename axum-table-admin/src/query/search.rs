//! Search requests
//!
//! A search arrives as untyped query-string pairs in ransack form:
//! `q[<field>_<predicate>]=value`, `q[s]=<field> <asc|desc>`, `page`,
//! `per_page`. Parsing here is schema-blind; fields are checked against the
//! table when the query is built.

use serde::{Deserialize, Serialize};

/// Comparison applied by a filter predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    NotEq,
    Cont,
    NotCont,
    Start,
    End,
    Lt,
    Lteq,
    Gt,
    Gteq,
    Null,
    NotNull,
    In,
}

impl Operator {
    /// Suffixes ordered so that longer ones win (`_not_eq` before `_eq`)
    const SUFFIXES: [(&'static str, Operator); 13] = [
        ("_not_null", Operator::NotNull),
        ("_not_cont", Operator::NotCont),
        ("_not_eq", Operator::NotEq),
        ("_start", Operator::Start),
        ("_lteq", Operator::Lteq),
        ("_gteq", Operator::Gteq),
        ("_cont", Operator::Cont),
        ("_null", Operator::Null),
        ("_end", Operator::End),
        ("_eq", Operator::Eq),
        ("_lt", Operator::Lt),
        ("_gt", Operator::Gt),
        ("_in", Operator::In),
    ];

    /// Split `name_cont` into (`name`, `Cont`)
    pub fn split_key(key: &str) -> Option<(&str, Operator)> {
        Self::SUFFIXES.iter().find_map(|(suffix, operator)| {
            key.strip_suffix(suffix)
                .filter(|field| !field.is_empty())
                .map(|field| (field, *operator))
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::NotEq => "not_eq",
            Operator::Cont => "cont",
            Operator::NotCont => "not_cont",
            Operator::Start => "start",
            Operator::End => "end",
            Operator::Lt => "lt",
            Operator::Lteq => "lteq",
            Operator::Gt => "gt",
            Operator::Gteq => "gteq",
            Operator::Null => "null",
            Operator::NotNull => "not_null",
            Operator::In => "in",
        }
    }
}

/// One `(field, operator, value)` filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub value: String,
}

/// Sort order for row queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Sort on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

/// Filters, sorts and pagination for one data request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub predicates: Vec<Predicate>,
    pub sorts: Vec<Sort>,
    /// 1-based page number
    pub page: u64,
    /// Requested page size; the configured default applies when absent
    pub per_page: Option<u64>,
    /// Input that could not be understood while parsing
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
            sorts: Vec::new(),
            page: 1,
            per_page: None,
            warnings: Vec::new(),
        }
    }
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate {
            field: field.into(),
            operator,
            value: value.into(),
        });
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sorts.push(Sort {
            field: field.into(),
            order,
        });
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Parse query-string pairs
    ///
    /// Keys that are not part of the search vocabulary (e.g. route params) are
    /// ignored; malformed search keys are recorded in `warnings`. Blank filter
    /// values are dropped, as an empty search form submits them.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = Self::default();

        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.as_ref().trim();

            match key {
                "page" => match value.parse::<u64>() {
                    Ok(page) => request.page = page.max(1),
                    Err(_) if value.is_empty() => {}
                    Err(_) => request.warnings.push(format!("ignoring invalid page '{value}'")),
                },
                "per_page" => match value.parse::<u64>() {
                    Ok(per_page) => request.per_page = Some(per_page),
                    Err(_) if value.is_empty() => {}
                    Err(_) => request
                        .warnings
                        .push(format!("ignoring invalid per_page '{value}'")),
                },
                _ => {
                    let Some(inner) = key
                        .strip_prefix("q[")
                        .and_then(|rest| rest.strip_suffix(']'))
                    else {
                        continue;
                    };

                    if inner == "s" || inner == "s][" {
                        request.parse_sorts(value);
                        continue;
                    }
                    if value.is_empty() {
                        continue;
                    }
                    match Operator::split_key(inner) {
                        Some((field, operator)) => request.predicates.push(Predicate {
                            field: field.to_string(),
                            operator,
                            value: value.to_string(),
                        }),
                        None => request
                            .warnings
                            .push(format!("ignoring unsupported search key '{inner}'")),
                    }
                }
            }
        }

        request
    }

    fn parse_sorts(&mut self, value: &str) {
        for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let mut parts = entry.split_whitespace();
            let Some(field) = parts.next() else { continue };
            let order = match parts.next().map(str::to_ascii_lowercase).as_deref() {
                None | Some("asc") => SortOrder::Ascending,
                Some("desc") => SortOrder::Descending,
                Some(other) => {
                    self.warnings
                        .push(format!("ignoring unknown sort direction '{other}' for {field}"));
                    SortOrder::Ascending
                }
            };
            self.sorts.push(Sort {
                field: field.to_string(),
                order,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_key_prefers_longest_suffix() {
        assert_eq!(Operator::split_key("name_not_eq"), Some(("name", Operator::NotEq)));
        assert_eq!(Operator::split_key("price_lteq"), Some(("price", Operator::Lteq)));
        assert_eq!(
            Operator::split_key("deleted_at_not_null"),
            Some(("deleted_at", Operator::NotNull))
        );
        assert_eq!(Operator::split_key("created_at_lt"), Some(("created_at", Operator::Lt)));
        assert_eq!(Operator::split_key("status_in"), Some(("status", Operator::In)));
        assert_eq!(Operator::split_key("_eq"), None);
        assert_eq!(Operator::split_key("name"), None);
    }

    #[test]
    fn test_from_pairs() {
        let request = SearchRequest::from_pairs([
            ("table_id", "orders"),
            ("q[status_eq]", "shipped"),
            ("q[total_gt]", "10"),
            ("q[note_cont]", ""),
            ("q[s]", "total desc, id"),
            ("page", "3"),
            ("per_page", "25"),
        ]);

        assert_eq!(request.predicates.len(), 2);
        assert_eq!(request.predicates[0].field, "status");
        assert_eq!(request.predicates[1].operator, Operator::Gt);
        assert_eq!(
            request.sorts,
            vec![
                Sort { field: "total".to_string(), order: SortOrder::Descending },
                Sort { field: "id".to_string(), order: SortOrder::Ascending },
            ]
        );
        assert_eq!(request.page, 3);
        assert_eq!(request.per_page, Some(25));
        assert!(request.warnings.is_empty());
    }

    #[test]
    fn test_malformed_input_degrades_to_warnings() {
        let request = SearchRequest::from_pairs([
            ("q[name_resembles]", "x"),
            ("page", "two"),
            ("q[s]", "name sideways"),
        ]);

        assert!(request.predicates.is_empty());
        assert_eq!(request.page, 1);
        assert_eq!(request.sorts[0].order, SortOrder::Ascending);
        assert_eq!(request.warnings.len(), 3);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let request = SearchRequest::from_pairs([("page", "0")]);
        assert_eq!(request.page, 1);
        assert_eq!(SearchRequest::new().page(0).page, 1);
    }
}
