//! The document store boundary.
//!
//! Everything the rest of the crate knows about persistence goes through
//! [`DocumentStore`]: subscribe to a collection, read it once, create,
//! merge-update or delete a document.

mod loro_store;
mod subscription;
#[cfg(test)]
pub(crate) mod testing;

pub use loro_store::LoroDocumentStore;
pub use subscription::{Snapshot, Subscription};
pub(crate) use subscription::SubscriberRegistry;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::entity::{normalize_time, RawDocument};
use crate::error::Result;

/// How a single field is written.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    /// Overwrite the field.
    Set(Value),
    /// Resolved by the store to its own clock at write time.
    ServerTimestamp,
    /// Append each element not already present in the array field.
    ArrayUnion(Vec<Value>),
}

pub type FieldWrites = BTreeMap<String, FieldWrite>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

pub trait DocumentStore: Send + Sync {
    /// Subscribe to a collection. The current snapshot is delivered first,
    /// then a fresh full snapshot after every change.
    fn subscribe(
        &self,
        collection: &str,
        order: Option<OrderBy>,
    ) -> impl Future<Output = Result<Subscription>> + Send;

    fn fetch(
        &self,
        collection: &str,
        order: Option<OrderBy>,
    ) -> impl Future<Output = Result<Vec<RawDocument>>> + Send;

    /// Create a document and return its store-assigned id.
    fn create(
        &self,
        collection: &str,
        fields: FieldWrites,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Merge `fields` into an existing document.
    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: FieldWrites,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete(&self, collection: &str, id: &str) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, PartialEq, PartialOrd)]
enum SortKey {
    Bool(bool),
    Number(f64),
    Time(DateTime<Utc>),
    Text(String),
}

fn sort_key(value: &Value) -> Option<SortKey> {
    if let Some(dt) = normalize_time(value) {
        return Some(SortKey::Time(dt));
    }
    match value {
        Value::Bool(b) => Some(SortKey::Bool(*b)),
        Value::Number(n) => n.as_f64().map(SortKey::Number),
        Value::String(s) => Some(SortKey::Text(s.clone())),
        _ => None,
    }
}

/// Stable sort by a field's normalized value. Documents missing the field
/// sort last in either direction.
pub(crate) fn sort_documents(docs: &mut [RawDocument], order: &OrderBy) {
    docs.sort_by(|a, b| {
        let ka = a.fields.get(&order.field).and_then(sort_key);
        let kb = b.fields.get(&order.field).and_then(sort_key);
        match (ka, kb) {
            (Some(ka), Some(kb)) => {
                let ord = ka.partial_cmp(&kb).unwrap_or(Ordering::Equal);
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}
