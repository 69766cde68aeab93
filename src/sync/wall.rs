use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::reconcile::reconcile_notes;
use super::{CollectionWatch, NoteEdit, NoteEditor, PendingWrites};
use crate::entity::{Note, NoteDraft, RawDocument};
use crate::error::{Result, StickyError};
use crate::schema::{FieldIssue, ValidationError};
use crate::storage::{DocumentStore, FieldWrite, FieldWrites, OrderBy};

/// Local view of all sticky notes, newest first.
pub struct NoteWall<S> {
    store: Arc<S>,
    collection: String,
    notes: Vec<Note>,
    pending: PendingWrites<Note>,
    loaded: bool,
}

impl<S: DocumentStore> NoteWall<S> {
    pub fn new(store: Arc<S>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            notes: Vec::new(),
            pending: PendingWrites::new(),
            loaded: false,
        }
    }

    pub fn order() -> OrderBy {
        OrderBy::desc("createdAt")
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id.as_deref() == Some(id))
    }

    /// True until the first snapshot has been applied.
    pub fn is_loading(&self) -> bool {
        !self.loaded
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.is_pending(id)
    }

    pub fn apply_snapshot(&mut self, batch: &[RawDocument]) {
        self.notes = reconcile_notes(batch);
        self.loaded = true;
        debug!(notes = self.notes.len(), "note wall snapshot applied");
    }

    pub async fn watch(&self) -> Result<CollectionWatch<Note>> {
        let subscription = self
            .store
            .subscribe(&self.collection, Some(Self::order()))
            .await?;
        Ok(CollectionWatch::notes(subscription))
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let batch = self
            .store
            .fetch(&self.collection, Some(Self::order()))
            .await?;
        self.apply_snapshot(&batch);
        Ok(())
    }

    /// Create a note. It shows up locally at once, without an id until the
    /// store assigns one; the stored `createdAt` comes from the store's clock.
    pub async fn create_note(&mut self, draft: NoteDraft) -> Result<String> {
        let mut issues = Vec::new();
        for (field, value) in [("title", &draft.title), ("content", &draft.content)] {
            if value.trim().is_empty() {
                issues.push(FieldIssue {
                    path: field.to_string(),
                    message: "must be non-empty".to_string(),
                });
            }
        }
        if !issues.is_empty() {
            return Err(ValidationError { issues }.into());
        }

        let mut fields = FieldWrites::new();
        fields.insert("title".to_string(), FieldWrite::Set(Value::String(draft.title.clone())));
        fields.insert(
            "content".to_string(),
            FieldWrite::Set(Value::String(draft.content.clone())),
        );
        fields.insert(
            "color".to_string(),
            FieldWrite::Set(Value::String(draft.color.to_string())),
        );
        fields.insert("createdAt".to_string(), FieldWrite::ServerTimestamp);

        self.notes.insert(
            0,
            Note {
                id: None,
                title: draft.title,
                content: draft.content,
                color: draft.color,
                created_at: Utc::now(),
            },
        );

        match self.store.create(&self.collection, fields).await {
            Ok(id) => {
                if let Some(note) = self.notes.iter_mut().find(|n| n.id.is_none()) {
                    note.id = Some(id.clone());
                }
                Ok(id)
            }
            Err(e) => {
                error!(error = %e, "failed to create note");
                if let Some(pos) = self.notes.iter().position(|n| n.id.is_none()) {
                    self.notes.remove(pos);
                }
                if e.write_applied() {
                    self.resync().await;
                }
                Err(e)
            }
        }
    }

    /// Take the store's state after a write it applied but could not save.
    async fn resync(&mut self) {
        if let Err(e) = self.refresh().await {
            error!(error = %e, "could not re-read notes");
        }
    }

    /// Write the changed fields of one note as a partial update.
    pub async fn edit_note(&mut self, id: &str, edit: NoteEdit) -> Result<()> {
        if edit.is_empty() {
            return Ok(());
        }
        edit.check()?;

        let Some(pos) = self.notes.iter().position(|n| n.id.as_deref() == Some(id)) else {
            warn!(id, "edit aborted: note not found");
            return Err(StickyError::NoteNotFound(id.to_string()));
        };

        let before = self.notes[pos].clone();
        let after = edit.apply_to(&before);
        self.notes[pos] = after.clone();
        self.pending.begin(id, before, after);

        match self.store.update(&self.collection, id, edit.to_writes()).await {
            Ok(()) => {
                self.pending.settle(id);
                Ok(())
            }
            Err(e) if e.write_applied() => {
                self.pending.settle(id);
                Err(e)
            }
            Err(e) => {
                error!(id, error = %e, "note write failed, rolling back");
                let current = self.note(id).cloned();
                if let Some(restore) = self.pending.rollback(id, current.as_ref()) {
                    if let Some(slot) = self.notes.iter_mut().find(|n| n.id.as_deref() == Some(id)) {
                        *slot = restore;
                    }
                }
                Err(e)
            }
        }
    }

    /// Commit an editor's drafts, if it has any.
    pub async fn commit_editor(&mut self, editor: &mut NoteEditor) -> Result<()> {
        let Some(id) = editor.note().id.clone() else {
            warn!("edit aborted: note has no id yet");
            return Err(StickyError::NoteNotPersisted);
        };
        let Some(edit) = editor.commit() else {
            return Ok(());
        };
        match self.edit_note(&id, edit.clone()).await {
            Ok(()) => {
                editor.settle(&edit);
                Ok(())
            }
            Err(e) => {
                if e.write_applied() {
                    editor.settle(&edit);
                }
                Err(e)
            }
        }
    }

    pub async fn delete_note(&mut self, id: &str) -> Result<()> {
        let Some(pos) = self.notes.iter().position(|n| n.id.as_deref() == Some(id)) else {
            warn!(id, "delete aborted: note not found");
            return Err(StickyError::NoteNotFound(id.to_string()));
        };

        let removed = self.notes.remove(pos);

        if let Err(e) = self.store.delete(&self.collection, id).await {
            if e.write_applied() {
                return Err(e);
            }
            error!(id, error = %e, "note delete failed, restoring");
            if self.note(id).is_none() {
                let pos = pos.min(self.notes.len());
                self.notes.insert(pos, removed);
            }
            return Err(e);
        }
        Ok(())
    }
}
