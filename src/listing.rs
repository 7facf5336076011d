//! Search and sort over already-fetched records.
//!
//! Collection endpoints fetch with the store's own filters, then narrow and
//! order the result here: a case-insensitive substring match over each
//! record's searchable fields, and a stable sort on one named key.

use serde::Deserialize;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// `?q=&sort=&dir=` on collection endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub sort: Option<String>,
    #[serde(default)]
    pub dir: SortDirection,
}

/// A comparable field value. Missing values sort first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Missing,
    Bool(bool),
    Int(i64),
    Date(Date),
    Time(OffsetDateTime),
    /// Lowercased for case-insensitive ordering.
    Text(String),
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_lowercase())
    }
}

impl From<&String> for SortValue {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<bool> for SortValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for SortValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for SortValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Date> for SortValue {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

impl From<OffsetDateTime> for SortValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::Time(value)
    }
}

impl<T: Into<SortValue>> From<Option<T>> for SortValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

/// A record that can be searched and sorted by name.
pub trait Listable {
    /// Field values matched by `q`.
    fn search_fields(&self) -> Vec<&str>;

    /// Value of the sort key `key`, or `None` if the record has no such key.
    fn sort_value(&self, key: &str) -> Option<SortValue>;
}

/// Filter by `params.q`, then sort by `params.sort`.
///
/// Unknown sort keys leave the fetched order unchanged.
#[must_use]
pub fn apply<T: Listable>(mut items: Vec<T>, params: &ListParams) -> Vec<T> {
    if let Some(needle) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let needle = needle.to_lowercase();
        items.retain(|item| matches_query(item, &needle));
    }

    let Some(key) = params.sort.as_deref().map(str::trim).filter(|k| !k.is_empty()) else {
        return items;
    };
    if items.first().is_some_and(|item| item.sort_value(key).is_none()) {
        return items;
    }
    items.sort_by_cached_key(|item| item.sort_value(key));
    if params.dir == SortDirection::Desc {
        reverse_stable(&mut items, key);
    }
    items
}

fn matches_query<T: Listable>(item: &T, needle: &str) -> bool {
    item.search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Reverse an ascending sort while keeping equal keys in fetched order.
fn reverse_stable<T: Listable>(items: &mut [T], key: &str) {
    items.reverse();
    let mut start = 0;
    while start < items.len() {
        let value = items[start].sort_value(key);
        let mut end = start + 1;
        while end < items.len() && items[end].sort_value(key) == value {
            end += 1;
        }
        items[start..end].reverse();
        start = end;
    }
}

#[cfg(test)]
#[path = "listing_test.rs"]
mod tests;
