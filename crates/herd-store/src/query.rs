//! Collection queries: filters, ordering and a result limit.

use std::cmp::Ordering;

use herd_shared::{Document, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// `field == value`
    Eq(String, Value),
    /// `field` is an array containing `value`
    ArrayContains(String, Value),
    /// Any of the inner filters matches.
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::ArrayContains(field.into(), value.into())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(field, value) => doc
                .get(field)
                .is_some_and(|v| v.compare(value) == Some(Ordering::Equal)),
            Filter::ArrayContains(field, value) => doc
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|v| v == value)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// All filters must match. Documents missing the ordering field sort last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Filter, order and truncate `(key, document)` pairs. Without an
    /// explicit ordering, key order is used.
    pub fn apply(&self, docs: impl IntoIterator<Item = (String, Document)>) -> Vec<(String, Document)> {
        let mut hits: Vec<(String, Document)> =
            docs.into_iter().filter(|(_, d)| self.matches(d)).collect();

        match &self.order_by {
            Some((field, direction)) => hits.sort_by(|(ka, a), (kb, b)| {
                let ord = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => {
                        let o = x.compare(y).unwrap_or(Ordering::Equal);
                        match direction {
                            Direction::Ascending => o,
                            Direction::Descending => o.reverse(),
                        }
                    }
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                ord.then_with(|| ka.cmp(kb))
            }),
            None => hits.sort_by(|(ka, _), (kb, _)| ka.cmp(kb)),
        }

        if let Some(limit) = self.limit {
            hits.truncate(limit);
        }
        hits
    }
}
