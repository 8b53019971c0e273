//! Filtering, ordering, and limiting applied uniformly by every backend.
//!
//! Documents are schemaless, so comparisons work on the JSON values
//! themselves: numbers numerically, strings lexically (which orders ISO
//! dates correctly), booleans as false < true.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring match for strings, membership for arrays.
    Contains,
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self { field: field.into(), op, value: value.into() }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };

        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Ne => actual != &self.value,
            FilterOp::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            FilterOp::Lte => {
                matches!(compare(actual, &self.value), Some(Ordering::Less | Ordering::Equal))
            }
            FilterOp::Contains => match (actual, &self.value) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle),
                (Value::Array(items), needle) => items.contains(needle),
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub order_by: Option<String>,
    pub descending: bool,
    pub limit: Option<usize>,
}

/// Compares two JSON scalars; `None` for mismatched or unordered types.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

pub(crate) fn apply_query(
    mut docs: Vec<Document>,
    filters: &[Filter],
    options: &QueryOptions,
) -> Vec<Document> {
    docs.retain(|doc| filters.iter().all(|f| f.matches(doc)));

    if let Some(field) = &options.order_by {
        docs.sort_by(|a, b| {
            let ordering = match (a.get(field), b.get(field)) {
                (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            if options.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    if let Some(limit) = options.limit {
        docs.truncate(limit);
    }

    docs
}
