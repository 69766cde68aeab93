use crate::entity::{Note, NoteColor};

use super::NoteEdit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Viewing,
    Editing,
}

/// Edit state for one note: `Viewing -> Editing -> Viewing`.
///
/// Drafts live here until `commit`, which hands back only the fields that
/// actually changed. While editing, incoming snapshots do not clobber drafts.
#[derive(Debug, Clone)]
pub struct NoteEditor {
    note: Note,
    title: String,
    content: String,
    color: NoteColor,
    state: EditState,
}

impl NoteEditor {
    pub fn new(note: Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            color: note.color,
            note,
            state: EditState::Viewing,
        }
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn begin(&mut self) {
        self.state = EditState::Editing;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.begin();
        self.title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.begin();
        self.content = content.into();
    }

    pub fn set_color(&mut self, color: NoteColor) {
        self.begin();
        self.color = color;
    }

    /// The changed fields, if any, ready to be written.
    ///
    /// With nothing changed the editor goes back to viewing. Otherwise it stays
    /// in editing, drafts intact, until [`NoteEditor::settle`] confirms the write.
    pub fn commit(&mut self) -> Option<NoteEdit> {
        let edit = NoteEdit {
            title: (self.title != self.note.title).then(|| self.title.clone()),
            content: (self.content != self.note.content).then(|| self.content.clone()),
            color: (self.color != self.note.color).then_some(self.color),
            created_at: None,
        };
        if edit.is_empty() {
            self.state = EditState::Viewing;
            return None;
        }
        Some(edit)
    }

    /// The store accepted `edit`; take it as the saved note and stop editing.
    pub fn settle(&mut self, edit: &NoteEdit) {
        self.note = edit.apply_to(&self.note);
        self.state = EditState::Viewing;
    }

    /// Drop drafts and go back to viewing.
    pub fn cancel(&mut self) {
        self.title = self.note.title.clone();
        self.content = self.note.content.clone();
        self.color = self.note.color;
        self.state = EditState::Viewing;
    }

    /// Take a newer version of the note from the store.
    /// Fields the user has not touched follow the store; drafts are kept.
    pub fn rebase(&mut self, latest: Note) {
        if self.state == EditState::Viewing {
            self.note = latest;
            self.cancel();
            return;
        }
        if self.title == self.note.title {
            self.title = latest.title.clone();
        }
        if self.content == self.note.content {
            self.content = latest.content.clone();
        }
        if self.color == self.note.color {
            self.color = latest.color;
        }
        self.note = latest;
    }
}
