//! A store wrapper for tests: records every write and can be told to fail.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{DocumentStore, FieldWrites, LoroDocumentStore, OrderBy, Subscription};
use crate::entity::RawDocument;
use crate::error::{Result, StickyError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedUpdate {
    pub collection: String,
    pub id: String,
    pub fields: FieldWrites,
}

pub(crate) struct RecordingStore {
    pub inner: LoroDocumentStore,
    pub updates: Mutex<Vec<RecordedUpdate>>,
    pub creates: Mutex<Vec<FieldWrites>>,
    pub deletes: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: LoroDocumentStore::in_memory(),
            updates: Mutex::new(Vec::new()),
            creates: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.updates.lock().unwrap().len()
            + self.creates.lock().unwrap().len()
            + self.deletes.lock().unwrap().len()
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StickyError::Storage("simulated outage".to_string()));
        }
        Ok(())
    }
}

impl DocumentStore for RecordingStore {
    async fn subscribe(&self, collection: &str, order: Option<OrderBy>) -> Result<Subscription> {
        self.inner.subscribe(collection, order).await
    }

    async fn fetch(&self, collection: &str, order: Option<OrderBy>) -> Result<Vec<RawDocument>> {
        self.inner.fetch(collection, order).await
    }

    async fn create(&self, collection: &str, fields: FieldWrites) -> Result<String> {
        self.creates.lock().unwrap().push(fields.clone());
        self.check()?;
        self.inner.create(collection, fields).await
    }

    async fn update(&self, collection: &str, id: &str, fields: FieldWrites) -> Result<()> {
        self.updates.lock().unwrap().push(RecordedUpdate {
            collection: collection.to_string(),
            id: id.to_string(),
            fields: fields.clone(),
        });
        self.check()?;
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(id.to_string());
        self.check()?;
        self.inner.delete(collection, id).await
    }
}
