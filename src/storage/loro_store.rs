use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use loro::{Container, LoroDoc, LoroMap, LoroValue, ValueOrContainer};
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use super::{
    sort_documents, DocumentStore, FieldWrite, FieldWrites, OrderBy, Snapshot, SubscriberRegistry,
    Subscription,
};
use crate::config::PROJECT_DIR;
use crate::entity::{RawDocument, WireTimestamp};
use crate::error::{Result, StickyError};

const STORE_FILE: &str = "store.loro";
const META_MAP: &str = "_meta";
const SEQUENCE_KEY: &str = "next_sequence";
const DOC_SEQ: &str = "seq";
const DOC_FIELDS: &str = "fields";

/// A document store kept in a Loro CRDT document.
///
/// Each collection is a root map keyed by document id. A document is a map
/// container holding its creation sequence number and a map of its fields,
/// so concurrent edits to different fields merge. In project mode the
/// document is saved to `.stickyboard/store.loro` after every write.
pub struct LoroDocumentStore {
    doc: Mutex<LoroDoc>,
    path: Option<PathBuf>,
    subscribers: Mutex<SubscriberRegistry>,
}

impl LoroDocumentStore {
    /// A store that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            doc: Mutex::new(LoroDoc::new()),
            path: None,
            subscribers: Mutex::new(SubscriberRegistry::default()),
        }
    }

    /// Initialize a new project store under `root`.
    pub fn init(root: &Path) -> Result<Self> {
        let project_dir = root.join(PROJECT_DIR);
        let path = project_dir.join(STORE_FILE);

        if path.exists() {
            return Err(StickyError::AlreadyInitialized);
        }

        fs::create_dir_all(&project_dir)?;

        let store = Self {
            doc: Mutex::new(LoroDoc::new()),
            path: Some(path),
            subscribers: Mutex::new(SubscriberRegistry::default()),
        };
        store.save()?;

        Ok(store)
    }

    /// Open an existing project store under `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(PROJECT_DIR).join(STORE_FILE);

        if !path.exists() {
            return Err(StickyError::NotInitialized);
        }

        let bytes = fs::read(&path)?;
        let doc = LoroDoc::new();
        doc.import(&bytes)?;

        Ok(Self {
            doc: Mutex::new(doc),
            path: Some(path),
            subscribers: Mutex::new(SubscriberRegistry::default()),
        })
    }

    /// Save the document to disk. A no-op for in-memory stores.
    pub fn save(&self) -> Result<()> {
        let doc = self.lock_doc()?;
        self.save_locked(&doc)
    }

    /// Number of subscriptions still receiving snapshots.
    pub fn active_subscriptions(&self) -> usize {
        self.subscribers
            .lock()
            .map(|mut s| s.active_count())
            .unwrap_or(0)
    }

    fn save_locked(&self, doc: &LoroDoc) -> Result<()> {
        if let Some(ref path) = self.path {
            let bytes = doc.export(loro::ExportMode::Snapshot)?;
            fs::write(path, bytes)?;
        }
        Ok(())
    }

    fn lock_doc(&self) -> Result<MutexGuard<'_, LoroDoc>> {
        self.doc
            .lock()
            .map_err(|_| StickyError::Storage("document lock poisoned".to_string()))
    }

    fn check_collection(collection: &str) -> Result<()> {
        if collection.is_empty() || collection.starts_with('_') {
            return Err(StickyError::InvalidInput(format!(
                "invalid collection name '{}'",
                collection
            )));
        }
        Ok(())
    }

    fn next_sequence(doc: &LoroDoc) -> Result<i64> {
        let meta = doc.get_map(META_MAP);
        let current = meta
            .get(SEQUENCE_KEY)
            .and_then(|v| match v {
                ValueOrContainer::Value(LoroValue::I64(n)) => Some(n),
                _ => None,
            })
            .unwrap_or(0);
        let next = current + 1;
        meta.insert(SEQUENCE_KEY, next)?;
        Ok(next)
    }

    /// The field map of a stored document, if the document exists.
    fn fields_map(doc: &LoroDoc, collection: &str, id: &str) -> Result<Option<LoroMap>> {
        let malformed = || {
            StickyError::Storage(format!("unexpected value stored at {}/{}", collection, id))
        };
        match doc.get_map(collection).get(id) {
            Some(ValueOrContainer::Container(Container::Map(entry))) => match entry.get(DOC_FIELDS) {
                Some(ValueOrContainer::Container(Container::Map(fields))) => Ok(Some(fields)),
                _ => Err(malformed()),
            },
            Some(_) => Err(malformed()),
            None => Ok(None),
        }
    }

    /// All documents in a collection, in creation order.
    fn list_locked(doc: &LoroDoc, collection: &str) -> Vec<(i64, RawDocument)> {
        let mut docs = Vec::new();
        if let LoroValue::Map(map) = doc.get_map(collection).get_deep_value() {
            for (id, value) in map.iter() {
                let LoroValue::Map(entry) = value else {
                    debug!(collection, id = %id, "skipping unreadable document");
                    continue;
                };
                let seq = match entry.get(DOC_SEQ) {
                    Some(LoroValue::I64(n)) => *n,
                    _ => i64::MAX,
                };
                let fields = match entry.get(DOC_FIELDS) {
                    Some(fields @ LoroValue::Map(_)) => Value::from(fields.clone()),
                    _ => {
                        debug!(collection, id = %id, "skipping document without fields");
                        continue;
                    }
                };
                docs.push((seq, RawDocument::new(id.to_string(), fields)));
            }
        }
        docs.sort_by_key(|(seq, _)| *seq);
        docs
    }

    fn snapshot_locked(doc: &LoroDoc, collection: &str, order: Option<&OrderBy>) -> Snapshot {
        let mut docs: Vec<RawDocument> = Self::list_locked(doc, collection)
            .into_iter()
            .map(|(_, d)| d)
            .collect();
        if let Some(order) = order {
            sort_documents(&mut docs, order);
        }
        docs
    }

    /// Commit, notify subscribers, then persist, all while the document is
    /// still locked so snapshots go out in commit order.
    ///
    /// A failed save leaves the change applied in memory and already published;
    /// that is reported as [`StickyError::NotSaved`].
    fn commit_and_publish(&self, doc: &LoroDoc, collection: &str) -> Result<()> {
        doc.commit();
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| StickyError::Storage("subscriber lock poisoned".to_string()))?;
        let delivered = subscribers.publish(collection, |order| {
            Self::snapshot_locked(doc, collection, order)
        });
        debug!(collection, delivered, "published snapshot");

        self.save_locked(doc).map_err(|e| {
            error!(collection, error = %e, "change applied but not saved");
            StickyError::NotSaved(e.to_string())
        })
    }
}

fn resolve_write(existing: Option<&Value>, write: FieldWrite) -> Value {
    match write {
        FieldWrite::Set(value) => value,
        FieldWrite::ServerTimestamp => WireTimestamp::now().to_value(),
        FieldWrite::ArrayUnion(items) => {
            let mut array = match existing {
                Some(Value::Array(current)) => current.clone(),
                _ => Vec::new(),
            };
            for item in items {
                if !array.contains(&item) {
                    array.push(item);
                }
            }
            Value::Array(array)
        }
    }
}

impl DocumentStore for LoroDocumentStore {
    async fn subscribe(&self, collection: &str, order: Option<OrderBy>) -> Result<Subscription> {
        Self::check_collection(collection)?;
        let doc = self.lock_doc()?;
        let initial = Self::snapshot_locked(&doc, collection, order.as_ref());
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| StickyError::Storage("subscriber lock poisoned".to_string()))?;
        debug!(collection, documents = initial.len(), "new subscription");
        Ok(subscribers.register(collection, order, initial))
    }

    async fn fetch(&self, collection: &str, order: Option<OrderBy>) -> Result<Vec<RawDocument>> {
        Self::check_collection(collection)?;
        let doc = self.lock_doc()?;
        Ok(Self::snapshot_locked(&doc, collection, order.as_ref()))
    }

    async fn create(&self, collection: &str, fields: FieldWrites) -> Result<String> {
        Self::check_collection(collection)?;
        let doc = self.lock_doc()?;

        let id = Uuid::new_v4().to_string();
        let seq = Self::next_sequence(&doc)?;

        let entry = doc
            .get_map(collection)
            .insert_container(&id, LoroMap::new())?;
        entry.insert(DOC_SEQ, seq)?;
        let record = entry.insert_container(DOC_FIELDS, LoroMap::new())?;
        for (name, write) in fields {
            record.insert(&name, LoroValue::from(resolve_write(None, write)))?;
        }

        self.commit_and_publish(&doc, collection)?;

        debug!(collection, id = %id, "created document");
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: FieldWrites) -> Result<()> {
        Self::check_collection(collection)?;
        let doc = self.lock_doc()?;

        let record = Self::fields_map(&doc, collection, id)?.ok_or_else(|| {
            StickyError::DocumentNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }
        })?;

        for (name, write) in fields {
            let existing = match record.get(&name) {
                Some(ValueOrContainer::Value(v)) => Some(Value::from(v)),
                _ => None,
            };
            record.insert(&name, LoroValue::from(resolve_write(existing.as_ref(), write)))?;
        }

        self.commit_and_publish(&doc, collection)?;

        debug!(collection, id, "updated document");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        Self::check_collection(collection)?;
        let doc = self.lock_doc()?;

        let map = doc.get_map(collection);
        if map.get(id).is_none() {
            return Err(StickyError::DocumentNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        map.delete(id)?;
        self.commit_and_publish(&doc, collection)?;

        debug!(collection, id, "deleted document");
        Ok(())
    }
}
